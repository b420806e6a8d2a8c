//! Repository implementations.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage in PostgreSQL
//! - [`PgStatsRepository`] - Click events and view-backed aggregates
//! - [`PgCursorRepository`] - Log watcher read positions
//! - [`MemoryStore`] - All three contracts in process memory

pub mod memory;
pub mod pg_cursor_repository;
pub mod pg_link_repository;
pub mod pg_stats_repository;

pub use memory::MemoryStore;
pub use pg_cursor_repository::PgCursorRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_stats_repository::PgStatsRepository;
