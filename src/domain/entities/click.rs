//! Click entity representing a single stored resolution event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a click event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LinkClick,
    QrScan,
    AdView,
    AdClick,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::LinkClick,
        EventType::QrScan,
        EventType::AdView,
        EventType::AdClick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LinkClick => "link_click",
            EventType::QrScan => "qr_scan",
            EventType::AdView => "ad_view",
            EventType::AdClick => "ad_click",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link_click" => Ok(EventType::LinkClick),
            "qr_scan" => Ok(EventType::QrScan),
            "ad_view" => Ok(EventType::AdView),
            "ad_click" => Ok(EventType::AdClick),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Which capture path produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSource {
    Inline,
    LogTail,
}

impl ClickSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickSource::Inline => "inline",
            ClickSource::LogTail => "log_tail",
        }
    }
}

/// A persisted click event. Immutable once stored.
///
/// `link_id` is a plain reference: events outlive deleted links.
#[derive(Debug, Clone)]
pub struct Click {
    pub id: i64,
    pub link_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub event_type: EventType,
    pub source: ClickSource,
}

/// Input data for recording a click.
///
/// `ingest_key` is set for log-tail events; a second insert with the same key
/// is silently ignored by the store.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub link_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub event_type: EventType,
    pub source: ClickSource,
    pub ingest_key: Option<String>,
}
