//! Redirect dispatch: resolves a short code and captures the click inline.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::click_event::{ClickEvent, resolution_event_type};
use crate::domain::click_worker::try_enqueue;
use crate::domain::entities::{EventType, Link};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::password::verify_password_blocking;

/// Successful resolution of a short code.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub link_id: i64,
    pub target_url: String,
    pub event_type: EventType,
}

/// Kind of advertisement interaction reported for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdKind {
    View,
    Click,
}

impl From<AdKind> for EventType {
    fn from(kind: AdKind) -> Self {
        match kind {
            AdKind::View => EventType::AdView,
            AdKind::Click => EventType::AdClick,
        }
    }
}

pub struct RedirectService<L: LinkRepository + ?Sized> {
    links: Arc<L>,
    click_tx: mpsc::Sender<ClickEvent>,
}

impl<L: LinkRepository + ?Sized> RedirectService<L> {
    pub fn new(links: Arc<L>, click_tx: mpsc::Sender<ClickEvent>) -> Self {
        Self { links, click_tx }
    }

    /// Resolves `code` to its target URL.
    ///
    /// Checks run in order: existence, active flag, expiry, password. Only a
    /// fully successful resolution enqueues a click event, and enqueueing never
    /// waits or fails the request.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the code is unknown
    /// - [`AppError::Gone`] if the link is inactive or expired
    /// - [`AppError::Unauthorized`] if a password is required and none was given
    /// - [`AppError::Forbidden`] if the given password is wrong
    pub async fn resolve(
        &self,
        code: &str,
        password: Option<&str>,
        query: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Resolution, AppError> {
        let link = self.usable_link(code).await?;

        if let Some(hash) = link.password_hash.clone() {
            let Some(candidate) = password else {
                return Err(AppError::unauthorized(
                    "Password required",
                    json!({ "code": code }),
                ));
            };
            if !verify_password_blocking(candidate.to_string(), hash).await? {
                return Err(AppError::forbidden(
                    "Incorrect password",
                    json!({ "code": code }),
                ));
            }
        }

        let event_type = resolution_event_type(query);
        let queued = try_enqueue(
            &self.click_tx,
            ClickEvent::inline(link.id, event_type, user_agent),
        );
        debug!(code, event_type = %event_type, queued, "Short link resolved");

        Ok(Resolution {
            link_id: link.id,
            target_url: link.target_url,
            event_type,
        })
    }

    /// Records an ad view or click for an active, unexpired link.
    ///
    /// Returns whether the event was queued.
    pub async fn record_ad(
        &self,
        code: &str,
        kind: AdKind,
        user_agent: Option<&str>,
    ) -> Result<bool, AppError> {
        let link = self.usable_link(code).await?;

        Ok(try_enqueue(
            &self.click_tx,
            ClickEvent::inline(link.id, kind.into(), user_agent),
        ))
    }

    async fn usable_link(&self, code: &str) -> Result<Link, AppError> {
        let link = self
            .links
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        if !link.active {
            return Err(AppError::gone(
                "Short link is disabled",
                json!({ "code": code, "reason": "inactive" }),
            ));
        }

        if link.is_expired() {
            return Err(AppError::gone(
                "Short link has expired",
                json!({ "code": code, "reason": "expired" }),
            ));
        }

        Ok(link)
    }
}
