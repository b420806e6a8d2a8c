//! PostgreSQL implementation of the log cursor repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::LogCursor;
use crate::domain::repositories::CursorRepository;
use crate::error::AppError;

pub struct PgCursorRepository {
    pool: Arc<PgPool>,
}

impl PgCursorRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorRepository for PgCursorRepository {
    async fn load(&self, source: &str) -> Result<Option<LogCursor>, AppError> {
        let cursor = sqlx::query_as::<_, LogCursor>(
            "SELECT source, file_id, byte_offset, updated_at FROM log_cursors WHERE source = $1",
        )
        .bind(source)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(cursor)
    }

    async fn save(&self, cursor: &LogCursor) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO log_cursors (source, file_id, byte_offset, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source) DO UPDATE SET
                file_id     = EXCLUDED.file_id,
                byte_offset = EXCLUDED.byte_offset,
                updated_at  = EXCLUDED.updated_at
            "#,
        )
        .bind(&cursor.source)
        .bind(&cursor.file_id)
        .bind(cursor.offset)
        .bind(cursor.updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<LogCursor>, AppError> {
        let cursors = sqlx::query_as::<_, LogCursor>(
            "SELECT source, file_id, byte_offset, updated_at FROM log_cursors ORDER BY source",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(cursors)
    }

    async fn reset(&self, source: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM log_cursors WHERE source = $1")
            .bind(source)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
