//! Repository trait for click events and their live aggregations.

use crate::domain::entities::{EventType, NewClick};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Event counts split by [`EventType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EventCounts {
    pub link_click: i64,
    pub qr_scan: i64,
    pub ad_view: i64,
    pub ad_click: i64,
}

impl EventCounts {
    pub fn total(&self) -> i64 {
        self.link_click + self.qr_scan + self.ad_view + self.ad_click
    }

    pub fn get(&self, event_type: EventType) -> i64 {
        match event_type {
            EventType::LinkClick => self.link_click,
            EventType::QrScan => self.qr_scan,
            EventType::AdView => self.ad_view,
            EventType::AdClick => self.ad_click,
        }
    }

    pub fn add(&mut self, event_type: EventType, n: i64) {
        match event_type {
            EventType::LinkClick => self.link_click += n,
            EventType::QrScan => self.qr_scan += n,
            EventType::AdView => self.ad_view += n,
            EventType::AdClick => self.ad_click += n,
        }
    }
}

/// Lifetime totals of a single link.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LinkTotals {
    pub link_id: i64,
    #[sqlx(flatten)]
    pub counts: EventCounts,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl LinkTotals {
    pub fn empty(link_id: i64) -> Self {
        Self {
            link_id,
            counts: EventCounts::default(),
            last_event_at: None,
        }
    }
}

/// Counts for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    #[sqlx(flatten)]
    pub counts: EventCounts,
}

/// Fleet-wide counts over nested recent windows.
///
/// `today` starts at 00:00 UTC; `week` and `month` are the rolling 7 and 30
/// days ending today, so each window contains the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentWindow {
    pub today: EventCounts,
    pub week: EventCounts,
    pub month: EventCounts,
    pub all_time: EventCounts,
}

/// Repository interface for click tracking and statistics.
///
/// All reads are computed from stored events at query time.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgStatsRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - in-process implementation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Stores a click event.
    ///
    /// Returns `Ok(false)` when an event with the same `ingest_key` already
    /// exists and nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn record_click(&self, new_click: NewClick) -> Result<bool, AppError>;

    /// Lifetime totals for one link. Links without events yield zero counts.
    async fn link_totals(&self, link_id: i64) -> Result<LinkTotals, AppError>;

    /// Lifetime totals for several links, in no particular order.
    async fn totals_for_links(&self, link_ids: Vec<i64>) -> Result<Vec<LinkTotals>, AppError>;

    /// Per-day counts for a link from `since` (inclusive) onward.
    ///
    /// Only days with at least one event are returned, ascending.
    async fn daily_counts(
        &self,
        link_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<DailyCount>, AppError>;

    /// Fleet-wide recent-window counts.
    async fn recent_window(&self) -> Result<RecentWindow, AppError>;

    /// Cheap connectivity probe used by the health check.
    async fn ping(&self) -> Result<(), AppError>;
}
