//! API route configuration.

use crate::api::handlers::{
    ad_event_handler, create_link_handler, delete_link_handler, get_link_handler,
    link_stats_handler, list_links_handler, redirect_handler, summary_handler,
    update_link_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Link management and statistics routes.
///
/// # Endpoints
///
/// - `POST   /urls`               - Create a short link
/// - `GET    /urls`               - List links with embedded totals (paginated)
/// - `GET    /urls/stats/summary` - Fleet-wide recent-window counts
/// - `GET    /urls/{id}`          - Get a link
/// - `PUT    /urls/{id}`          - Partially update a link
/// - `DELETE /urls/{id}`          - Delete a link
/// - `GET    /urls/{id}/stats`    - Totals and daily buckets for a link
pub fn management_routes() -> Router<AppState> {
    Router::new()
        .route("/urls", post(create_link_handler).get(list_links_handler))
        .route("/urls/stats/summary", get(summary_handler))
        .route(
            "/urls/{id}",
            get(get_link_handler)
                .put(update_link_handler)
                .delete(delete_link_handler),
        )
        .route("/urls/{id}/stats", get(link_stats_handler))
}

/// Public short link routes, nested under the short path prefix.
///
/// # Endpoints
///
/// - `GET  /{code}`    - Resolve and redirect
/// - `POST /{code}/ad` - Record an ad view or click
pub fn short_link_routes() -> Router<AppState> {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/{code}/ad", post(ad_event_handler))
}
