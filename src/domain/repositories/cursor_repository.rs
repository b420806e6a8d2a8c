//! Repository trait for durable log-tail cursors.

use crate::domain::entities::LogCursor;
use crate::error::AppError;
use async_trait::async_trait;

/// Stores one [`LogCursor`] per watched source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CursorRepository: Send + Sync {
    /// Loads the last committed cursor of a source.
    async fn load(&self, source: &str) -> Result<Option<LogCursor>, AppError>;

    /// Upserts the cursor of `cursor.source`.
    async fn save(&self, cursor: &LogCursor) -> Result<(), AppError>;

    /// Lists all cursors ordered by source.
    async fn list(&self) -> Result<Vec<LogCursor>, AppError>;

    /// Forgets a source's cursor so the next run starts at the top of the file.
    ///
    /// Returns `Ok(false)` if there was none.
    async fn reset(&self, source: &str) -> Result<bool, AppError>;
}
