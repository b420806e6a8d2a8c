//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /s/{code}`   - Short link redirect (public, redirect rate limit)
//! - `POST /s/{code}/ad` - Ad event reporting (public, redirect rate limit)
//! - `/urls/*`          - Management and statistics API (management rate limit)
//! - `GET  /health`     - Health check: storage, click queue (not limited)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-client fixed window, one table per scope
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// Short links are mounted under `state.short_path_prefix`. Client identity
/// for rate limiting comes from `state.client_identity`, which only trusts
/// forwarded headers when the service runs behind a proxy.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state))
}

/// All routes and middleware without path normalization.
pub fn api_router(state: AppState) -> Router {
    let management = api::routes::management_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), rate_limit::management_layer),
    );

    let short_links = api::routes::short_link_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), rate_limit::redirect_layer),
    );

    let prefix = state.short_path_prefix.clone();

    Router::new()
        .route("/health", get(health_handler))
        .merge(management)
        .nest(&prefix, short_links)
        .with_state(state)
        .layer(tracing::layer())
}
