//! In-process storage backend.
//!
//! [`MemoryStore`] implements every repository trait with the same observable
//! semantics as PostgreSQL: code inserts are atomic check-and-insert, ingest
//! keys are deduplicated, and aggregates are computed from the stored events
//! on every query. Data is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use dashmap::DashMap;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{Mutex, RwLock};

use crate::domain::entities::{Click, Link, LinkPatch, LogCursor, NewClick, NewLink};
use crate::domain::repositories::{
    CursorRepository, DailyCount, EventCounts, LinkRepository, LinkTotals, RecentWindow,
    StatsRepository,
};
use crate::error::AppError;

#[derive(Default)]
struct LinkTable {
    by_id: BTreeMap<i64, Link>,
    ids_by_code: HashMap<String, i64>,
}

#[derive(Default)]
struct ClickLog {
    events: Vec<Click>,
    ingest_keys: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    links: RwLock<LinkTable>,
    clicks: Mutex<ClickLog>,
    cursors: DashMap<String, LogCursor>,
    next_link_id: AtomicI64,
    next_click_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Start instants of the nested recent windows: (today, week, month).
pub(crate) fn window_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let start = |day: NaiveDate| day.and_time(chrono::NaiveTime::MIN).and_utc();

    (
        start(today),
        start(today.checked_sub_days(Days::new(6)).unwrap_or(today)),
        start(today.checked_sub_days(Days::new(29)).unwrap_or(today)),
    )
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut table = self.links.write().await;

        if table.ids_by_code.contains_key(&new_link.code) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "links_code_key" }),
            ));
        }

        let id = self.next_link_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let link = Link {
            id,
            code: new_link.code,
            target_url: new_link.target_url,
            created_at: now,
            updated_at: now,
            expires_at: new_link.expires_at,
            active: true,
            password_hash: new_link.password_hash,
            owner_id: new_link.owner_id,
            qr_generated: false,
        };

        table.ids_by_code.insert(link.code.clone(), id);
        table.by_id.insert(id, link.clone());

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        Ok(self.links.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let table = self.links.read().await;
        Ok(table
            .ids_by_code
            .get(code)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Link>, AppError> {
        let table = self.links.read().await;

        // Ids grow with creation time, so reverse id order is newest first.
        Ok(table
            .by_id
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.links.read().await.by_id.len() as i64)
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let mut table = self.links.write().await;

        let Some(link) = table.by_id.get_mut(&id) else {
            return Err(AppError::not_found("Link not found", json!({ "id": id })));
        };

        patch.apply_to(link, Utc::now());
        Ok(link.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut table = self.links.write().await;

        match table.by_id.remove(&id) {
            Some(link) => {
                table.ids_by_code.remove(&link.code);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn record_click(&self, new_click: NewClick) -> Result<bool, AppError> {
        let mut log = self.clicks.lock().await;

        if let Some(key) = &new_click.ingest_key
            && !log.ingest_keys.insert(key.clone())
        {
            return Ok(false);
        }

        let id = self.next_click_id.fetch_add(1, Ordering::SeqCst) + 1;
        log.events.push(Click {
            id,
            link_id: new_click.link_id,
            occurred_at: new_click.occurred_at,
            user_agent: new_click.user_agent,
            event_type: new_click.event_type,
            source: new_click.source,
        });

        Ok(true)
    }

    async fn link_totals(&self, link_id: i64) -> Result<LinkTotals, AppError> {
        let log = self.clicks.lock().await;
        let mut totals = LinkTotals::empty(link_id);

        for click in log.events.iter().filter(|c| c.link_id == link_id) {
            totals.counts.add(click.event_type, 1);
            totals.last_event_at = totals.last_event_at.max(Some(click.occurred_at));
        }

        Ok(totals)
    }

    async fn totals_for_links(&self, link_ids: Vec<i64>) -> Result<Vec<LinkTotals>, AppError> {
        let log = self.clicks.lock().await;
        let mut by_id: HashMap<i64, LinkTotals> = link_ids
            .iter()
            .map(|&id| (id, LinkTotals::empty(id)))
            .collect();

        for click in &log.events {
            if let Some(totals) = by_id.get_mut(&click.link_id) {
                totals.counts.add(click.event_type, 1);
                totals.last_event_at = totals.last_event_at.max(Some(click.occurred_at));
            }
        }

        Ok(link_ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }

    async fn daily_counts(
        &self,
        link_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<DailyCount>, AppError> {
        let log = self.clicks.lock().await;
        let mut days: BTreeMap<NaiveDate, EventCounts> = BTreeMap::new();

        for click in log.events.iter().filter(|c| c.link_id == link_id) {
            let day = click.occurred_at.date_naive();
            if day >= since {
                days.entry(day).or_default().add(click.event_type, 1);
            }
        }

        Ok(days
            .into_iter()
            .map(|(day, counts)| DailyCount { day, counts })
            .collect())
    }

    async fn recent_window(&self) -> Result<RecentWindow, AppError> {
        let log = self.clicks.lock().await;
        let (today_start, week_start, month_start) = window_starts(Utc::now());
        let mut window = RecentWindow::default();

        for click in &log.events {
            let at = click.occurred_at;
            window.all_time.add(click.event_type, 1);
            if at >= month_start {
                window.month.add(click.event_type, 1);
            }
            if at >= week_start {
                window.week.add(click.event_type, 1);
            }
            if at >= today_start {
                window.today.add(click.event_type, 1);
            }
        }

        Ok(window)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl CursorRepository for MemoryStore {
    async fn load(&self, source: &str) -> Result<Option<LogCursor>, AppError> {
        Ok(self.cursors.get(source).map(|c| c.value().clone()))
    }

    async fn save(&self, cursor: &LogCursor) -> Result<(), AppError> {
        self.cursors.insert(cursor.source.clone(), cursor.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LogCursor>, AppError> {
        let mut cursors: Vec<LogCursor> = self.cursors.iter().map(|c| c.value().clone()).collect();
        cursors.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(cursors)
    }

    async fn reset(&self, source: &str) -> Result<bool, AppError> {
        Ok(self.cursors.remove(source).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ClickSource, EventType};
    use chrono::Duration;
    use std::sync::Arc;

    fn new_link(code: &str) -> NewLink {
        NewLink {
            code: code.to_string(),
            target_url: "https://example.com/".to_string(),
            expires_at: None,
            password_hash: None,
            owner_id: None,
        }
    }

    fn click(link_id: i64, event_type: EventType, at: DateTime<Utc>) -> NewClick {
        NewClick {
            link_id,
            occurred_at: at,
            user_agent: None,
            event_type,
            source: ClickSource::Inline,
            ingest_key: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let store = MemoryStore::new();

        store.create(new_link("abcd1")).await.unwrap();
        let err = store.create(new_link("abcd1")).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_codes_are_case_sensitive() {
        let store = MemoryStore::new();

        store.create(new_link("Promo1")).await.unwrap();
        store.create(new_link("promo1")).await.unwrap();

        assert!(store.find_by_code("PROMO1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_one_code() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_link("race42")).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AppError::Conflict { .. })),
            }
        }

        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_paging() {
        let store = MemoryStore::new();
        for code in ["aaaa", "bbbb", "cccc"] {
            store.create(new_link(code)).await.unwrap();
        }

        let page: Vec<String> = LinkRepository::list(&store, 1, 5)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();

        assert_eq!(page, vec!["bbbb", "aaaa"]);
    }

    #[tokio::test]
    async fn test_delete_frees_code_and_keeps_events() {
        let store = MemoryStore::new();
        let link = store.create(new_link("gone1")).await.unwrap();
        store
            .record_click(click(link.id, EventType::LinkClick, Utc::now()))
            .await
            .unwrap();

        assert!(store.delete(link.id).await.unwrap());
        assert!(!store.delete(link.id).await.unwrap());
        assert!(store.find_by_code("gone1").await.unwrap().is_none());
        assert_eq!(store.link_totals(link.id).await.unwrap().counts.total(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update(9, LinkPatch::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ingest_key_is_idempotent() {
        let store = MemoryStore::new();
        let mut event = click(1, EventType::LinkClick, Utc::now());
        event.ingest_key = Some("edge:1-ab:0".to_string());

        assert!(store.record_click(event.clone()).await.unwrap());
        assert!(!store.record_click(event).await.unwrap());
        assert_eq!(store.link_totals(1).await.unwrap().counts.total(), 1);
    }

    #[tokio::test]
    async fn test_daily_sum_equals_total() {
        let store = MemoryStore::new();
        let now = Utc::now();

        for days_ago in [0, 0, 1, 3, 40] {
            store
                .record_click(click(5, EventType::LinkClick, now - Duration::days(days_ago)))
                .await
                .unwrap();
        }
        store
            .record_click(click(5, EventType::QrScan, now))
            .await
            .unwrap();

        let since = (now - Duration::days(365)).date_naive();
        let daily = store.daily_counts(5, since).await.unwrap();
        let totals = store.link_totals(5).await.unwrap();

        let sum: i64 = daily.iter().map(|d| d.counts.total()).sum();
        assert_eq!(sum, totals.counts.total());
        assert!(daily.windows(2).all(|w| w[0].day < w[1].day));
        assert_eq!(daily.last().unwrap().counts.qr_scan, 1);
    }

    #[tokio::test]
    async fn test_recent_windows_are_nested() {
        let store = MemoryStore::new();
        let now = Utc::now();

        for days_ago in [0, 2, 6, 7, 20, 29, 30, 100] {
            store
                .record_click(click(1, EventType::AdView, now - Duration::days(days_ago)))
                .await
                .unwrap();
        }

        let window = store.recent_window().await.unwrap();

        assert!(window.today.total() <= window.week.total());
        assert!(window.week.total() <= window.month.total());
        assert!(window.month.total() <= window.all_time.total());
        assert_eq!(window.all_time.ad_view, 8);
    }

    #[test]
    fn test_window_starts() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let (today, week, month) = window_starts(now);

        assert_eq!(today.to_rfc3339(), "2026-03-10T00:00:00+00:00");
        assert_eq!(week.to_rfc3339(), "2026-03-04T00:00:00+00:00");
        assert_eq!(month.to_rfc3339(), "2026-02-09T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_cursor_round_trip_and_reset() {
        let store = MemoryStore::new();
        let cursor = LogCursor {
            source: "edge".to_string(),
            file_id: "12-abcd".to_string(),
            offset: 512,
            updated_at: Utc::now(),
        };

        store.save(&cursor).await.unwrap();
        assert_eq!(store.load("edge").await.unwrap(), Some(cursor));
        assert!(store.reset("edge").await.unwrap());
        assert!(store.load("edge").await.unwrap().is_none());
    }
}
