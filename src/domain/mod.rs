//! Domain layer containing business entities and logic.
//!
//! Entities, repository contracts and the click pipeline live here,
//! independent of HTTP and storage.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Queued click event model
//! - [`click_worker`] - Asynchronous click persistence
//! - [`audit`] - Audit trail collaborator
//!
//! # Click Processing Flow
//!
//! 1. The redirect service resolves a link, or the log watcher parses a line
//! 2. A [`click_event::ClickEvent`] is pushed into the bounded channel
//! 3. [`click_worker::run_click_worker`] persists it with retries
//! 4. Statistics read the stored events through [`repositories::StatsRepository`]

pub mod audit;
pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod repositories;
