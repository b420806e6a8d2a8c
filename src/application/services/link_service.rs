//! Link management and short code allocation.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::audit::{AuditEntry, AuditOutcome, AuditSink};
use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::{LinkRepository, LinkTotals, StatsRepository};
use crate::error::AppError;
use crate::utils::code_generator::{MAX_CODE_LENGTH, generate_code, validate_custom_code};
use crate::utils::password::hash_password_blocking;
use crate::utils::target_url::normalize_target_url;

/// Insert attempts per code length before widening.
const ATTEMPTS_PER_LENGTH: usize = 5;
/// How many times the code length may grow by one character.
const MAX_WIDENINGS: usize = 2;

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub target_url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub owner_id: Option<String>,
}

/// Input for [`LinkService::update`]. `None` leaves a field unchanged; the
/// inner `None` of a double option clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateLink {
    pub target_url: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub active: Option<bool>,
    pub password: Option<Option<String>>,
    pub qr_generated: Option<bool>,
}

/// A page of links with their lifetime totals.
#[derive(Debug, Clone)]
pub struct LinkPage {
    pub items: Vec<(Link, LinkTotals)>,
    pub total: i64,
}

/// Creates, reads, updates and deletes short links.
///
/// Every mutating call takes the acting client identity and reports an
/// audit entry with the outcome.
pub struct LinkService<L: LinkRepository + ?Sized, S: StatsRepository + ?Sized> {
    links: Arc<L>,
    stats: Arc<S>,
    audit: Arc<dyn AuditSink>,
    code_length: usize,
}

impl<L: LinkRepository + ?Sized, S: StatsRepository + ?Sized> LinkService<L, S> {
    pub fn new(
        links: Arc<L>,
        stats: Arc<S>,
        audit: Arc<dyn AuditSink>,
        code_length: usize,
    ) -> Self {
        Self {
            links,
            stats,
            audit,
            code_length,
        }
    }

    /// Creates a link and returns it once it is durably stored.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a bad target URL, custom code format,
    ///   empty password or an expiry in the past
    /// - [`AppError::Conflict`] if the custom code is reserved or taken
    /// - [`AppError::AllocationExhausted`] if no free generated code was found
    pub async fn create(&self, actor: &str, input: CreateLink) -> Result<Link, AppError> {
        let custom = input.custom_code.clone();
        let result = self.create_inner(input).await;

        let action = match (&result, &custom) {
            (Ok(link), _) => format!("link.create code={}", link.code),
            (Err(_), Some(code)) => format!("link.create code={code}"),
            (Err(_), None) => "link.create".to_string(),
        };
        self.record(actor, action, &result);

        result
    }

    async fn create_inner(&self, input: CreateLink) -> Result<Link, AppError> {
        let target_url = normalize_target_url(&input.target_url)?;

        if let Some(expires_at) = input.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::bad_request(
                "Expiry must be in the future",
                json!({ "expires_at": expires_at }),
            ));
        }

        let password_hash = match input.password {
            Some(password) => Some(hash_password_blocking(password).await?),
            None => None,
        };

        let template = NewLink {
            code: String::new(),
            target_url,
            expires_at: input.expires_at,
            password_hash,
            owner_id: input.owner_id,
        };

        match input.custom_code {
            Some(code) => self.insert_custom(code, template).await,
            None => self.allocate(template).await,
        }
    }

    async fn insert_custom(&self, code: String, template: NewLink) -> Result<Link, AppError> {
        validate_custom_code(&code)?;

        let new_link = NewLink {
            code: code.clone(),
            ..template
        };

        match self.links.create(new_link).await {
            Err(AppError::Conflict { .. }) => Err(AppError::conflict(
                "Custom code already taken",
                json!({ "code": code }),
            )),
            other => other,
        }
    }

    /// Inserts generated candidates until one is accepted by the store.
    ///
    /// Uniqueness comes solely from the store's atomic insert; a conflict just
    /// means another candidate is drawn. After [`ATTEMPTS_PER_LENGTH`]
    /// conflicts the code grows by one character, at most [`MAX_WIDENINGS`] times.
    async fn allocate(&self, template: NewLink) -> Result<Link, AppError> {
        let first = self.code_length;
        let last = (first + MAX_WIDENINGS).min(MAX_CODE_LENGTH);

        for length in first..=last {
            for attempt in 1..=ATTEMPTS_PER_LENGTH {
                let new_link = NewLink {
                    code: generate_code(length),
                    ..template.clone()
                };

                match self.links.create(new_link).await {
                    Ok(link) => return Ok(link),
                    Err(AppError::Conflict { .. }) => {
                        debug!(length, attempt, "Generated code collided, retrying");
                    }
                    Err(e) => return Err(e),
                }
            }

            if length < last {
                warn!(from = length, to = length + 1, "Code space crowded, widening codes");
            }
        }

        Err(AppError::allocation_exhausted(
            "Failed to allocate a unique code",
            json!({ "max_length": last }),
        ))
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn get(&self, id: i64) -> Result<Link, AppError> {
        self.links
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    /// Lists links newest first with embedded lifetime totals.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<LinkPage, AppError> {
        let links = self.links.list(offset, limit).await?;
        let total = self.links.count().await?;

        let ids: Vec<i64> = links.iter().map(|l| l.id).collect();
        let mut totals = self.stats.totals_for_links(ids).await?;

        let items = links
            .into_iter()
            .map(|link| {
                let position = totals.iter().position(|t| t.link_id == link.id);
                let link_totals = match position {
                    Some(i) => totals.swap_remove(i),
                    None => LinkTotals::empty(link.id),
                };
                (link, link_totals)
            })
            .collect();

        Ok(LinkPage { items, total })
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown id and
    /// [`AppError::Validation`] for a bad target URL or empty password.
    pub async fn update(&self, actor: &str, id: i64, input: UpdateLink) -> Result<Link, AppError> {
        let result = self.update_inner(id, input).await;
        self.record(actor, format!("link.update id={id}"), &result);
        result
    }

    async fn update_inner(&self, id: i64, input: UpdateLink) -> Result<Link, AppError> {
        let target_url = input
            .target_url
            .as_deref()
            .map(normalize_target_url)
            .transpose()?;

        let password_hash = match input.password {
            Some(Some(password)) => Some(Some(hash_password_blocking(password).await?)),
            Some(None) => Some(None),
            None => None,
        };

        let patch = LinkPatch {
            target_url,
            expires_at: input.expires_at,
            active: input.active,
            password_hash,
            qr_generated: input.qr_generated,
        };

        self.links.update(id, patch).await
    }

    /// Soft-disables a link by code.
    pub async fn disable_by_code(&self, actor: &str, code: &str) -> Result<Link, AppError> {
        let result = async {
            let link = self
                .links
                .find_by_code(code)
                .await?
                .ok_or_else(|| AppError::not_found("Link not found", json!({ "code": code })))?;

            self.links
                .update(
                    link.id,
                    LinkPatch {
                        active: Some(false),
                        ..Default::default()
                    },
                )
                .await
        }
        .await;

        self.record(actor, format!("link.disable code={code}"), &result);
        result
    }

    /// Deletes a link. Its click events are kept.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn delete(&self, actor: &str, id: i64) -> Result<(), AppError> {
        let result = match self.links.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::not_found("Link not found", json!({ "id": id }))),
            Err(e) => Err(e),
        };

        self.record(actor, format!("link.delete id={id}"), &result);
        result
    }

    fn record<T>(&self, actor: &str, action: String, result: &Result<T, AppError>) {
        let outcome = if result.is_ok() {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };

        if outcome == AuditOutcome::Success {
            info!(actor, action = %action, "Management operation");
        }
        self.audit.record(AuditEntry::new(actor, action, outcome));
    }
}
