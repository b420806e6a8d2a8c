//! Audit trail collaborator for management operations.
//!
//! Recording is fire-and-forget: an audit sink cannot fail the operation it
//! describes.

use chrono::{DateTime, Utc};
use std::fmt;

/// Whether the audited operation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => f.write_str("success"),
            AuditOutcome::Failure => f.write_str("failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub outcome: AuditOutcome,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor: &str, action: impl Into<String>, outcome: AuditOutcome) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.into(),
            outcome,
            at: Utc::now(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes audit entries to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            actor = %entry.actor,
            action = %entry.action,
            outcome = %entry.outcome,
            at = %entry.at.to_rfc3339(),
            "audit"
        );
    }
}
