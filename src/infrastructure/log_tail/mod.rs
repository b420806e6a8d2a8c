//! Fallback click capture from edge access logs.
//!
//! One [`LogWatcher`] task runs per configured source. It feeds the same
//! bounded click channel as the redirect handler; events carry an ingest key
//! so that re-reading a region of a file never stores a click twice.

pub mod file_identity;
pub mod parser;
pub mod watcher;

pub use parser::LineParser;
pub use watcher::{LogSource, LogWatcher, WatcherConfig};
