//! PostgreSQL repository tests. Run with `cargo test --features pg-tests`
//! and `DATABASE_URL` pointing at a server where test databases may be created.
#![cfg(feature = "pg-tests")]

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use clickpath::domain::entities::{ClickSource, EventType, LinkPatch, LogCursor, NewClick, NewLink};
use clickpath::domain::repositories::{CursorRepository, LinkRepository, StatsRepository};
use clickpath::error::AppError;
use clickpath::infrastructure::persistence::{
    PgCursorRepository, PgLinkRepository, PgStatsRepository,
};

fn new_link(code: &str) -> NewLink {
    NewLink {
        code: code.to_string(),
        target_url: "https://example.com/".to_string(),
        expires_at: None,
        password_hash: None,
        owner_id: None,
    }
}

fn click(link_id: i64, event_type: EventType, days_ago: i64) -> NewClick {
    NewClick {
        link_id,
        occurred_at: Utc::now() - Duration::days(days_ago),
        user_agent: Some("pg-test".to_string()),
        event_type,
        source: ClickSource::Inline,
        ingest_key: None,
    }
}

// ─── LINKS ───────────────────────────────────────────────────────────────────

#[sqlx::test]
async fn test_duplicate_code_is_conflict(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    repo.create(new_link("PgDup1")).await.unwrap();
    let err = repo.create(new_link("PgDup1")).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict { .. }));
}

#[sqlx::test]
async fn test_codes_are_case_sensitive(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    repo.create(new_link("PgCase")).await.unwrap();
    repo.create(new_link("pgcase")).await.unwrap();

    assert!(repo.find_by_code("PGCASE").await.unwrap().is_none());
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[sqlx::test]
async fn test_update_and_delete(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    let link = repo.create(new_link("PgUpd1")).await.unwrap();

    let updated = repo
        .update(
            link.id,
            LinkPatch {
                active: Some(false),
                expires_at: Some(Some(Utc::now() + Duration::days(1))),
                ..LinkPatch::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.active);
    assert!(updated.expires_at.is_some());
    assert!(updated.updated_at >= link.updated_at);

    assert!(repo.delete(link.id).await.unwrap());
    assert!(!repo.delete(link.id).await.unwrap());

    let err = repo.update(link.id, LinkPatch::default()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[sqlx::test]
async fn test_list_newest_first(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    for code in ["PgLst1", "PgLst2", "PgLst3"] {
        repo.create(new_link(code)).await.unwrap();
    }

    let codes: Vec<String> = LinkRepository::list(&repo, 0, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.code)
        .collect();

    assert_eq!(codes, vec!["PgLst3", "PgLst2"]);
}

// ─── STATS ───────────────────────────────────────────────────────────────────

#[sqlx::test]
async fn test_totals_daily_and_window(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);

    let link = links.create(new_link("PgStat")).await.unwrap();
    for (event_type, days_ago) in [
        (EventType::LinkClick, 0),
        (EventType::LinkClick, 2),
        (EventType::QrScan, 0),
        (EventType::AdView, 10),
        (EventType::AdClick, 45),
    ] {
        assert!(stats.record_click(click(link.id, event_type, days_ago)).await.unwrap());
    }

    let totals = stats.link_totals(link.id).await.unwrap();
    assert_eq!(totals.counts.total(), 5);
    assert_eq!(totals.counts.link_click, 2);
    assert!(totals.last_event_at.is_some());

    let since = (Utc::now() - Duration::days(364)).date_naive();
    let daily = stats.daily_counts(link.id, since).await.unwrap();
    let sum: i64 = daily.iter().map(|d| d.counts.total()).sum();
    assert_eq!(sum, totals.counts.total());

    let window = stats.recent_window().await.unwrap();
    assert_eq!(window.today.total(), 2);
    assert_eq!(window.week.total(), 3);
    assert_eq!(window.month.total(), 4);
    assert_eq!(window.all_time.total(), 5);
}

#[sqlx::test]
async fn test_events_survive_link_delete(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);

    let link = links.create(new_link("PgKeep")).await.unwrap();
    stats
        .record_click(click(link.id, EventType::LinkClick, 0))
        .await
        .unwrap();
    links.delete(link.id).await.unwrap();

    assert_eq!(stats.link_totals(link.id).await.unwrap().counts.total(), 1);
    assert_eq!(stats.recent_window().await.unwrap().all_time.total(), 1);
}

#[sqlx::test]
async fn test_ingest_key_deduplicates(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);

    let link = links.create(new_link("PgIngs")).await.unwrap();
    let mut event = click(link.id, EventType::LinkClick, 0);
    event.source = ClickSource::LogTail;
    event.ingest_key = Some("edge:42-abcd:0".to_string());

    assert!(stats.record_click(event.clone()).await.unwrap());
    assert!(!stats.record_click(event).await.unwrap());
    assert_eq!(stats.link_totals(link.id).await.unwrap().counts.total(), 1);
}

#[sqlx::test]
async fn test_totals_for_links_keeps_order(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);

    let a = links.create(new_link("PgOrdA")).await.unwrap();
    let b = links.create(new_link("PgOrdB")).await.unwrap();
    stats
        .record_click(click(b.id, EventType::QrScan, 0))
        .await
        .unwrap();

    let totals = stats.totals_for_links(vec![b.id, a.id]).await.unwrap();

    assert_eq!(totals[0].link_id, b.id);
    assert_eq!(totals[0].counts.qr_scan, 1);
    assert_eq!(totals[1].link_id, a.id);
    assert_eq!(totals[1].counts.total(), 0);
}

// ─── CURSORS ─────────────────────────────────────────────────────────────────

#[sqlx::test]
async fn test_cursor_upsert_list_reset(pool: PgPool) {
    let repo = PgCursorRepository::new(Arc::new(pool));

    let mut cursor = LogCursor {
        source: "edge".to_string(),
        file_id: "12-abcd".to_string(),
        offset: 128,
        updated_at: Utc::now(),
    };
    repo.save(&cursor).await.unwrap();

    cursor.offset = 512;
    repo.save(&cursor).await.unwrap();

    let loaded = repo.load("edge").await.unwrap().unwrap();
    assert_eq!(loaded.offset, 512);
    assert_eq!(CursorRepository::list(&repo).await.unwrap().len(), 1);

    assert!(repo.reset("edge").await.unwrap());
    assert!(!repo.reset("edge").await.unwrap());
    assert!(repo.load("edge").await.unwrap().is_none());
}
