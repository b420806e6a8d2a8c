//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

use crate::domain::entities::{ClickSource, EventType};

/// Query parameter marking a request that came from a scanned QR code.
pub const QR_MARKER_PARAM: &str = "qr";

/// Returns true if a raw query string carries the QR marker (`qr=1` or `qr=true`).
pub fn has_qr_marker(query: Option<&str>) -> bool {
    query.is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .any(|(key, value)| key == QR_MARKER_PARAM && matches!(value.as_ref(), "1" | "true"))
    })
}

/// Event type of a successful resolution.
pub fn resolution_event_type(query: Option<&str>) -> EventType {
    if has_qr_marker(query) {
        EventType::QrScan
    } else {
        EventType::LinkClick
    }
}

/// How a queued event refers to its link.
///
/// The dispatcher already holds the resolved link and sends its id; the log
/// watcher only sees the code in a request path and lets the worker resolve it.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkRef {
    Id(i64),
    Code(String),
}

/// An in-memory click event travelling from a capture path to the click worker.
///
/// Handlers and the log watcher push these into a bounded channel; the
/// worker converts them into [`crate::domain::entities::NewClick`] rows.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub link: LinkRef,
    pub occurred_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub event_type: EventType,
    pub source: ClickSource,
    pub ingest_key: Option<String>,
}

impl ClickEvent {
    /// Creates an event captured by the dispatcher for an already-resolved link.
    pub fn inline(link_id: i64, event_type: EventType, user_agent: Option<&str>) -> Self {
        Self {
            link: LinkRef::Id(link_id),
            occurred_at: Utc::now(),
            user_agent: user_agent.map(|s| s.to_string()),
            event_type,
            source: ClickSource::Inline,
            ingest_key: None,
        }
    }

    /// Creates an event recovered from an access-log line.
    ///
    /// `ingest_key` must be stable for the line so that re-reading it is a no-op.
    pub fn from_log(
        code: String,
        occurred_at: DateTime<Utc>,
        user_agent: Option<String>,
        event_type: EventType,
        ingest_key: String,
    ) -> Self {
        Self {
            link: LinkRef::Code(code),
            occurred_at,
            user_agent,
            event_type,
            source: ClickSource::LogTail,
            ingest_key: Some(ingest_key),
        }
    }
}
