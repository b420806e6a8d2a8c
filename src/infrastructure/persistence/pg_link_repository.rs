//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for link storage and retrieval.
///
/// Code uniqueness is enforced by the `links_code_key` constraint; a duplicate
/// insert surfaces as [`AppError::Conflict`].
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (code, target_url, expires_at, password_hash, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, target_url, created_at, updated_at, expires_at,
                      active, password_hash, owner_id, qr_generated
            "#,
        )
        .bind(&new_link.code)
        .bind(&new_link.target_url)
        .bind(new_link.expires_at)
        .bind(&new_link.password_hash)
        .bind(&new_link.owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, code, target_url, created_at, updated_at, expires_at,
                   active, password_hash, owner_id, qr_generated
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, code, target_url, created_at, updated_at, expires_at,
                   active, password_hash, owner_id, qr_generated
            FROM links
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Link>, AppError> {
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, code, target_url, created_at, updated_at, expires_at,
                   active, password_hash, owner_id, qr_generated
            FROM links
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        // Double options become a "touch" flag plus the new value.
        let (set_expiry, expires_at) = match patch.expires_at {
            Some(value) => (true, value),
            None => (false, None),
        };
        let (set_password, password_hash) = match patch.password_hash {
            Some(value) => (true, value),
            None => (false, None),
        };

        let link = sqlx::query_as::<_, Link>(
            r#"
            UPDATE links SET
                target_url    = COALESCE($2, target_url),
                expires_at    = CASE WHEN $3 THEN $4 ELSE expires_at END,
                active        = COALESCE($5, active),
                password_hash = CASE WHEN $6 THEN $7 ELSE password_hash END,
                qr_generated  = COALESCE($8, qr_generated),
                updated_at    = now()
            WHERE id = $1
            RETURNING id, code, target_url, created_at, updated_at, expires_at,
                      active, password_hash, owner_id, qr_generated
            "#,
        )
        .bind(id)
        .bind(patch.target_url)
        .bind(set_expiry)
        .bind(expires_at)
        .bind(patch.active)
        .bind(set_password)
        .bind(password_hash)
        .bind(patch.qr_generated)
        .fetch_optional(self.pool.as_ref())
        .await?;

        link.ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
