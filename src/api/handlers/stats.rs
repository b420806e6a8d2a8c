//! Handlers for link statistics and the fleet summary.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::stats::{LinkStatsResponse, StatsQuery, SummaryResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Per-link totals and daily buckets, computed from stored events.
///
/// # Endpoint
///
/// `GET /urls/{id}/stats?days=30`
///
/// # Response
///
/// ```json
/// {
///   "id": 7,
///   "code": "abc123",
///   "short_url": "https://sho.rt/s/abc123",
///   "totals": { "total": 3, "link_click": 2, "qr_scan": 1, "ad_view": 0, "ad_click": 0, "last_event_at": "..." },
///   "days": 30,
///   "daily": [ { "day": "2026-03-10", "total": 3, "link_click": 2, "qr_scan": 1, "ad_view": 0, "ad_click": 0 } ]
/// }
/// ```
///
/// # Errors
///
/// Returns 400 if `days` is outside `1..=365`, 404 for an unknown link.
pub async fn link_stats_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<LinkStatsResponse>, AppError> {
    let stats = state.stats_service.link_stats(id, query.days).await?;

    Ok(Json(LinkStatsResponse {
        id: stats.link.id,
        short_url: state.short_url(&stats.link.code),
        code: stats.link.code,
        totals: stats.totals.into(),
        days: stats.daily.len(),
        daily: stats.daily.into_iter().map(Into::into).collect(),
    }))
}

/// Fleet-wide counts for today, the last 7 and 30 days, and all time.
///
/// # Endpoint
///
/// `GET /urls/stats/summary`
pub async fn summary_handler(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.stats_service.summary().await?;
    let window = summary.window;

    Ok(Json(SummaryResponse {
        links_total: summary.links_total,
        today: window.today.into(),
        week: window.week.into(),
        month: window.month.into(),
        all_time: window.all_time.into(),
    }))
}
