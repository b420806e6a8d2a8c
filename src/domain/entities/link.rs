//! Link entity representing a short code mapped to a target URL.

use chrono::{DateTime, Utc};

/// A short link with its access-control state.
///
/// `password_hash` is present iff the link is password-protected.
/// `expires_at` is evaluated against wall-clock time at resolution.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub password_hash: Option<String>,
    pub owner_id: Option<String>,
    pub qr_generated: bool,
}

impl Link {
    /// Returns true if the link has a password.
    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Returns true if the link is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now > e)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Input data for inserting a link.
///
/// `code` is a candidate: the insert fails with a conflict if the code is taken.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub code: String,
    pub target_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
    pub owner_id: Option<String>,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged.
/// `expires_at: Some(None)` clears the expiry; `Some(Some(t))` sets it.
/// `password_hash: Some(None)` removes protection.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub target_url: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub active: Option<bool>,
    pub password_hash: Option<Option<String>>,
    pub qr_generated: Option<bool>,
}

impl LinkPatch {
    /// Applies the patch in place and bumps `updated_at`.
    pub fn apply_to(self, link: &mut Link, now: DateTime<Utc>) {
        if let Some(url) = self.target_url {
            link.target_url = url;
        }
        if let Some(expires_at) = self.expires_at {
            link.expires_at = expires_at;
        }
        if let Some(active) = self.active {
            link.active = active;
        }
        if let Some(password_hash) = self.password_hash {
            link.password_hash = password_hash;
        }
        if let Some(qr_generated) = self.qr_generated {
            link.qr_generated = qr_generated;
        }
        link.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) fn sample_link(id: i64, code: &str) -> Link {
    let now = Utc::now();
    Link {
        id,
        code: code.to_string(),
        target_url: "https://example.com/".to_string(),
        created_at: now,
        updated_at: now,
        expires_at: None,
        active: true,
        password_hash: None,
        owner_id: None,
        qr_generated: false,
    }
}
