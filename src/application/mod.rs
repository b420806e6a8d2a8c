//! Application layer services implementing business logic.
//!
//! Services coordinate repository calls, validation and business rules, and
//! give HTTP handlers and the admin CLI a single API.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link management and code allocation
//! - [`services::redirect_service::RedirectService`] - Short code resolution
//! - [`services::stats_service::StatsService`] - Live click statistics

pub mod services;
