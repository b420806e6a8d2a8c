//! Per-client fixed-window rate limiting.
//!
//! Two scopes share the same mechanism but keep separate tables: redirects
//! (high volume, public) and the management API.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::extractors::ClientKey;
use crate::error::AppError;
use crate::infrastructure::rate_limit::{RateDecision, RateLimiter};
use crate::state::AppState;

/// Limits `GET /s/{code}` and ad event reporting.
///
/// # Example
///
/// ```rust,ignore
/// let short = Router::new()
///     .route("/{code}", get(redirect_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::redirect_layer));
/// ```
pub async fn redirect_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limiter = state.redirect_limiter.clone();
    enforce(&state, limiter.as_ref(), "redirect", req, next).await
}

/// Limits the management and statistics API.
pub async fn management_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limiter = state.management_limiter.clone();
    enforce(&state, limiter.as_ref(), "management", req, next).await
}

async fn enforce(
    state: &AppState,
    limiter: &dyn RateLimiter,
    scope: &'static str,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();
    let ClientKey(client) = ClientKey::from_parts(&parts, state);

    match limiter.check(&client) {
        RateDecision::Allowed { .. } => Ok(next.run(Request::from_parts(parts, body)).await),
        RateDecision::Limited { retry_after_secs } => {
            metrics::counter!("rate_limit_rejections_total", "scope" => scope).increment(1);
            debug!(client, scope, retry_after_secs, "Rate limit exceeded");
            Err(AppError::rate_limited(retry_after_secs))
        }
    }
}
