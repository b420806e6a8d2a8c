//! PostgreSQL implementation of statistics repository.
//!
//! Aggregates are read from the `link_click_totals`, `link_click_daily` and
//! `click_recent_window` views, so every query reflects the stored events.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{EventType, NewClick};
use crate::domain::repositories::{DailyCount, LinkTotals, RecentWindow, StatsRepository};
use crate::error::AppError;

/// PostgreSQL repository for click tracking and analytics.
pub struct PgStatsRepository {
    pool: Arc<PgPool>,
}

impl PgStatsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WindowRow {
    event_type: String,
    today: i64,
    week: i64,
    month: i64,
    all_time: i64,
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn record_click(&self, new_click: NewClick) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO click_events (link_id, occurred_at, user_agent, event_type, source, ingest_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (ingest_key) DO NOTHING
            "#,
        )
        .bind(new_click.link_id)
        .bind(new_click.occurred_at)
        .bind(&new_click.user_agent)
        .bind(new_click.event_type.as_str())
        .bind(new_click.source.as_str())
        .bind(&new_click.ingest_key)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn link_totals(&self, link_id: i64) -> Result<LinkTotals, AppError> {
        let totals = sqlx::query_as::<_, LinkTotals>(
            r#"
            SELECT link_id, link_click, qr_scan, ad_view, ad_click, last_event_at
            FROM link_click_totals
            WHERE link_id = $1
            "#,
        )
        .bind(link_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(totals.unwrap_or_else(|| LinkTotals::empty(link_id)))
    }

    async fn totals_for_links(&self, link_ids: Vec<i64>) -> Result<Vec<LinkTotals>, AppError> {
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, LinkTotals>(
            r#"
            SELECT link_id, link_click, qr_scan, ad_view, ad_click, last_event_at
            FROM link_click_totals
            WHERE link_id = ANY($1)
            "#,
        )
        .bind(&link_ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut by_id: HashMap<i64, LinkTotals> =
            rows.into_iter().map(|t| (t.link_id, t)).collect();

        Ok(link_ids
            .into_iter()
            .map(|id| by_id.remove(&id).unwrap_or_else(|| LinkTotals::empty(id)))
            .collect())
    }

    async fn daily_counts(
        &self,
        link_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<DailyCount>, AppError> {
        let days = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT day, link_click, qr_scan, ad_view, ad_click
            FROM link_click_daily
            WHERE link_id = $1 AND day >= $2
            ORDER BY day ASC
            "#,
        )
        .bind(link_id)
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(days)
    }

    async fn recent_window(&self) -> Result<RecentWindow, AppError> {
        let rows = sqlx::query_as::<_, WindowRow>(
            "SELECT event_type, today, week, month, all_time FROM click_recent_window",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut window = RecentWindow::default();
        for row in rows {
            let Ok(event_type) = row.event_type.parse::<EventType>() else {
                tracing::warn!(event_type = %row.event_type, "Ignoring unknown event type");
                continue;
            };

            window.today.add(event_type, row.today);
            window.week.add(event_type, row.week);
            window.month.add(event_type, row.month);
            window.all_time.add(event_type, row.all_time);
        }

        Ok(window)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
