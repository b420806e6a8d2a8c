//! DTO for the link update endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::serde_as;
use validator::Validate;

use crate::application::services::UpdateLink;

/// Request body for `PUT /urls/{id}`.
///
/// All fields are optional; only provided fields are changed.
///
/// # Nullable fields
///
/// For `expires_at` and `password`:
///
/// - **Absent** → leave existing value unchanged
/// - **`null`** → clear it (never expires / no password)
/// - **Value** → set it
#[serde_as]
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[serde(alias = "url")]
    #[validate(url(message = "Invalid URL format"))]
    pub target_url: Option<String>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    pub active: Option<bool>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub password: Option<Option<String>>,

    /// Set by the QR renderer's caller once an image exists.
    pub qr_generated: Option<bool>,
}

impl From<UpdateLinkRequest> for UpdateLink {
    fn from(req: UpdateLinkRequest) -> Self {
        UpdateLink {
            target_url: req.target_url,
            expires_at: req.expires_at,
            active: req.active,
            password: req.password,
            qr_generated: req.qr_generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let absent: UpdateLinkRequest = serde_json::from_str(r#"{"active":false}"#).unwrap();
        assert_eq!(absent.expires_at, None);
        assert_eq!(absent.password, None);
        assert_eq!(absent.active, Some(false));

        let cleared: UpdateLinkRequest =
            serde_json::from_str(r#"{"expires_at":null,"password":null}"#).unwrap();
        assert_eq!(cleared.expires_at, Some(None));
        assert_eq!(cleared.password, Some(None));

        let set: UpdateLinkRequest = serde_json::from_str(
            r#"{"expires_at":"2030-01-01T00:00:00Z","password":"pw"}"#,
        )
        .unwrap();
        assert!(matches!(set.expires_at, Some(Some(_))));
        assert_eq!(set.password, Some(Some("pw".to_string())));
    }

    #[test]
    fn test_invalid_url_fails_validation() {
        let req: UpdateLinkRequest = serde_json::from_str(r#"{"url":"nope"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
