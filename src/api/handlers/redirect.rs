//! Handlers for short code resolution and ad events.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::Redirect,
};

use crate::api::dto::ad::AdEventRequest;
use crate::api::extractors::LinkPassword;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /s/{code}` (append `?qr=1` for requests coming from a QR code)
///
/// # Request Flow
///
/// 1. Look up the link (404 if unknown)
/// 2. Reject inactive or expired links (410)
/// 3. Check the password of protected links (401 challenge, 403 on mismatch)
/// 4. Queue a click event without waiting for it
/// 5. Return 307 Temporary Redirect
///
/// Protected links accept the password as HTTP Basic credentials or in the
/// `X-Link-Password` header. Error bodies never contain the target URL.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    LinkPassword(password): LinkPassword,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let resolution = state
        .redirect_service
        .resolve(&code, password.as_deref(), query.as_deref(), user_agent)
        .await?;

    Ok(Redirect::temporary(&resolution.target_url))
}

/// Records an ad view or click for a link.
///
/// # Endpoint
///
/// `POST /s/{code}/ad` with `{"kind": "view" | "click"}` → 202 Accepted
pub async fn ad_event_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdEventRequest>,
) -> Result<StatusCode, AppError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    state
        .redirect_service
        .record_ad(&code, payload.kind.into(), user_agent)
        .await?;

    Ok(StatusCode::ACCEPTED)
}
