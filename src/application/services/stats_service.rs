//! Click statistics computed live from stored events.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::Link;
use crate::domain::repositories::{
    DailyCount, EventCounts, LinkRepository, LinkTotals, RecentWindow, StatsRepository,
};
use crate::error::AppError;

pub const DEFAULT_STATS_DAYS: u32 = 30;
pub const MAX_STATS_DAYS: u32 = 365;

/// Per-link statistics: lifetime totals plus one bucket per day.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub link: Link,
    pub totals: LinkTotals,
    /// Oldest day first, one entry per day including days without events.
    pub daily: Vec<DailyCount>,
}

/// Fleet-wide summary.
#[derive(Debug, Clone)]
pub struct Summary {
    pub links_total: i64,
    pub window: RecentWindow,
}

/// Service for link and fleet statistics.
///
/// Nothing is cached: every call reads the event store.
pub struct StatsService<L: LinkRepository + ?Sized, S: StatsRepository + ?Sized> {
    links: Arc<L>,
    stats: Arc<S>,
}

impl<L: LinkRepository + ?Sized, S: StatsRepository + ?Sized> StatsService<L, S> {
    pub fn new(links: Arc<L>, stats: Arc<S>) -> Self {
        Self { links, stats }
    }

    /// Statistics for one link over the last `days` days (default 30).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `days` is outside `1..=365` and
    /// [`AppError::NotFound`] if the link does not exist.
    pub async fn link_stats(&self, id: i64, days: Option<u32>) -> Result<LinkStats, AppError> {
        let days = days.unwrap_or(DEFAULT_STATS_DAYS);
        if !(1..=MAX_STATS_DAYS).contains(&days) {
            return Err(AppError::bad_request(
                "days must be between 1 and 365",
                json!({ "days": days }),
            ));
        }

        let link = self
            .links
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        let today = Utc::now().date_naive();
        let since = today - Duration::days(i64::from(days) - 1);

        let totals = self.stats.link_totals(id).await?;
        let sparse = self.stats.daily_counts(id, since).await?;

        Ok(LinkStats {
            link,
            totals,
            daily: fill_days(sparse, since, today),
        })
    }

    pub async fn summary(&self) -> Result<Summary, AppError> {
        let links_total = self.links.count().await?;
        let window = self.stats.recent_window().await?;

        Ok(Summary {
            links_total,
            window,
        })
    }

    /// Storage connectivity probe.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.stats.ping().await
    }
}

/// Expands sparse ascending day counts to one entry per day in `since..=until`.
fn fill_days(sparse: Vec<DailyCount>, since: NaiveDate, until: NaiveDate) -> Vec<DailyCount> {
    let mut sparse = sparse.into_iter().peekable();

    since
        .iter_days()
        .take_while(|day| *day <= until)
        .map(|day| {
            while sparse.next_if(|d| d.day < day).is_some() {}

            match sparse.next_if(|d| d.day == day) {
                Some(found) => found,
                None => DailyCount {
                    day,
                    counts: EventCounts::default(),
                },
            }
        })
        .collect()
}
