//! Handlers for link management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::link::{CreateLinkRequest, LinkListResponse, LinkResponse};
use crate::api::dto::pagination::{PaginationMeta, PaginationParams};
use crate::api::dto::update_link::UpdateLinkRequest;
use crate::api::extractors::ClientKey;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /urls`
///
/// # Request Body
///
/// ```json
/// {
///   "target_url": "https://example.com/landing",
///   "custom_code": "Spring26",              // optional
///   "expires_at": "2026-12-31T23:59:59Z",   // optional
///   "password": "hunter2"                   // optional
/// }
/// ```
///
/// The link is stored before the response is sent, so the returned code
/// resolves immediately.
///
/// # Errors
///
/// - 400 for an invalid URL, code format, password or past expiry
/// - 409 if the custom code is reserved or already taken
/// - 500 if no free code could be allocated
pub async fn create_link_handler(
    State(state): State<AppState>,
    ClientKey(actor): ClientKey,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state.link_service.create(&actor, payload.into()).await?;
    let short_url = state.short_url(&link.code);

    Ok((StatusCode::CREATED, Json(LinkResponse::new(link, short_url))))
}

/// Lists links, newest first, with lifetime totals embedded.
///
/// # Endpoint
///
/// `GET /urls?page=1&page_size=25`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<LinkListResponse>, AppError> {
    let (offset, limit) = params
        .validate_and_get_offset_limit()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let page = state.link_service.list(offset, limit).await?;

    let items = page
        .items
        .into_iter()
        .map(|(link, totals)| {
            let short_url = state.short_url(&link.code);
            LinkResponse::new(link, short_url).with_stats(totals)
        })
        .collect();

    Ok(Json(LinkListResponse {
        pagination: PaginationMeta::new(params.page(), params.page_size(), page.total),
        items,
    }))
}

/// `GET /urls/{id}`
pub async fn get_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.get(id).await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::new(link, short_url)))
}

/// Partially updates a link.
///
/// # Endpoint
///
/// `PUT /urls/{id}`
///
/// # Request Body
///
/// All fields are optional. `expires_at` and `password` accept `null` to clear.
///
/// ```json
/// {
///   "target_url": "https://example.com/new",
///   "expires_at": null,
///   "active": false,
///   "password": "s3cret",
///   "qr_generated": true
/// }
/// ```
pub async fn update_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ClientKey(actor): ClientKey,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state.link_service.update(&actor, id, payload.into()).await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::new(link, short_url)))
}

/// Deletes a link. Its recorded click events are kept.
///
/// # Endpoint
///
/// `DELETE /urls/{id}` → 204 No Content
pub async fn delete_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ClientKey(actor): ClientKey,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
