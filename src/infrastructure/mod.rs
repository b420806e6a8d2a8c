//! Infrastructure layer for external integrations.
//!
//! Implements the domain contracts against real resources.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL and in-memory repositories
//! - [`rate_limit`] - Fixed-window request limiter
//! - [`log_tail`] - Access-log watcher feeding the click pipeline

pub mod log_tail;
pub mod persistence;
pub mod rate_limit;
