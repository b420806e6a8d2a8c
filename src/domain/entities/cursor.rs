//! Durable read position of a tailed access-log source.

use chrono::{DateTime, Utc};

/// Where the log watcher stopped reading a source.
///
/// `file_id` identifies the physical file the offset refers to, so a rotated
/// or truncated file is never read from a stale position.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LogCursor {
    pub source: String,
    pub file_id: String,
    #[sqlx(rename = "byte_offset")]
    pub offset: i64,
    pub updated_at: DateTime<Utc>,
}
