//! Repository trait definitions for the domain layer.
//!
//! Traits define the storage contract; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated via
//! `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Short link CRUD with atomic code uniqueness
//! - [`StatsRepository`] - Click recording and live aggregation
//! - [`CursorRepository`] - Log-tail read positions

pub mod cursor_repository;
pub mod link_repository;
pub mod stats_repository;

pub use cursor_repository::CursorRepository;
pub use link_repository::LinkRepository;
pub use stats_repository::{DailyCount, EventCounts, LinkTotals, RecentWindow, StatsRepository};

#[cfg(test)]
pub use cursor_repository::MockCursorRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use stats_repository::MockStatsRepository;
