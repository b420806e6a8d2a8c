//! DTOs for link creation and link responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::pagination::PaginationMeta;
use crate::application::services::CreateLink;
use crate::domain::entities::Link;
use crate::domain::repositories::{EventCounts, LinkTotals};

/// Request body for `POST /urls`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Destination URL (http or https).
    #[serde(alias = "url")]
    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(max = 2048))]
    pub target_url: String,

    /// Optional custom short code; otherwise one is generated.
    #[validate(length(min = 4, max = 20))]
    pub custom_code: Option<String>,

    /// After this instant the link answers 410 Gone.
    pub expires_at: Option<DateTime<Utc>>,

    /// Protects the link; stored only as an Argon2 hash.
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,

    #[validate(length(max = 128))]
    pub owner_id: Option<String>,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(req: CreateLinkRequest) -> Self {
        CreateLink {
            target_url: req.target_url,
            custom_code: req.custom_code,
            expires_at: req.expires_at,
            password: req.password,
            owner_id: req.owner_id,
        }
    }
}

/// Lifetime counts embedded in link responses.
#[derive(Debug, Serialize)]
pub struct TotalsDto {
    pub total: i64,
    #[serde(flatten)]
    pub by_type: EventCounts,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl From<LinkTotals> for TotalsDto {
    fn from(totals: LinkTotals) -> Self {
        Self {
            total: totals.counts.total(),
            by_type: totals.counts,
            last_event_at: totals.last_event_at,
        }
    }
}

/// A link as returned by the management API. Never contains the password hash.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub code: String,
    pub short_url: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub password_protected: bool,
    pub owner_id: Option<String>,
    pub qr_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TotalsDto>,
}

impl LinkResponse {
    pub fn new(link: Link, short_url: String) -> Self {
        Self {
            id: link.id,
            password_protected: link.is_protected(),
            code: link.code,
            short_url,
            target_url: link.target_url,
            created_at: link.created_at,
            updated_at: link.updated_at,
            expires_at: link.expires_at,
            active: link.active,
            owner_id: link.owner_id,
            qr_generated: link.qr_generated,
            stats: None,
        }
    }

    pub fn with_stats(mut self, totals: LinkTotals) -> Self {
        self.stats = Some(totals.into());
        self
    }
}

/// Paginated link listing for `GET /urls`.
#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub pagination: PaginationMeta,
    pub items: Vec<LinkResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::link::sample_link;

    #[test]
    fn test_create_request_accepts_url_alias() {
        let req: CreateLinkRequest =
            serde_json::from_str(r#"{"url":"https://example.com","custom_code":"promo1"}"#)
                .unwrap();

        assert_eq!(req.target_url, "https://example.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_validation() {
        let bad_url: CreateLinkRequest =
            serde_json::from_str(r#"{"target_url":"not a url"}"#).unwrap();
        assert!(bad_url.validate().is_err());

        let long_code: CreateLinkRequest = serde_json::from_str(
            r#"{"target_url":"https://example.com","custom_code":"abcdefghijklmnopqrstu"}"#,
        )
        .unwrap();
        assert!(long_code.validate().is_err());

        let empty_password: CreateLinkRequest =
            serde_json::from_str(r#"{"target_url":"https://example.com","password":""}"#).unwrap();
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_response_hides_password_hash() {
        let mut link = sample_link(3, "abc123");
        link.password_hash = Some("$argon2id$v=19$secret".to_string());

        let json = serde_json::to_value(LinkResponse::new(
            link,
            "https://sho.rt/s/abc123".to_string(),
        ))
        .unwrap();

        assert_eq!(json["password_protected"], true);
        assert!(!json.to_string().contains("argon2"));
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_totals_are_flattened() {
        let mut totals = LinkTotals::empty(3);
        totals.counts.link_click = 2;
        totals.counts.qr_scan = 1;

        let json = serde_json::to_value(TotalsDto::from(totals)).unwrap();

        assert_eq!(json["total"], 3);
        assert_eq!(json["link_click"], 2);
        assert_eq!(json["qr_scan"], 1);
    }
}
