//! Access-log line parsing.
//!
//! Lines are JSON objects. Field names follow a plain schema with
//! CloudFront-style aliases:
//!
//! | field          | aliases                  |
//! |----------------|--------------------------|
//! | `timestamp`    | `time`                   |
//! | `path`         | `uri`, `cs-uri-stem`     |
//! | `query`        | `cs-uri-query`           |
//! | `status`       | `sc-status`              |
//! | `user_agent`   | `cs(User-Agent)`         |
//! | `cache_status` | `x-edge-result-type`     |
//!
//! Only redirects answered by the edge cache become click events. A request
//! that reached the origin was already captured by the redirect handler.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::domain::click_event::resolution_event_type;
use crate::domain::entities::EventType;
use crate::utils::code_generator::is_valid_code;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(alias = "time")]
    timestamp: DateTime<Utc>,
    #[serde(alias = "uri", alias = "cs-uri-stem")]
    path: String,
    #[serde(default, alias = "cs-uri-query")]
    query: Option<String>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(alias = "sc-status")]
    status: u16,
    #[serde(default, alias = "cs(User-Agent)")]
    user_agent: Option<String>,
    #[serde(default, alias = "x-edge-result-type")]
    cache_status: Option<String>,
}

/// A click recovered from a log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub code: String,
    pub occurred_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub event_type: EventType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    NotShortLink,
    NotRedirect,
    ReachedOrigin,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Blank => "blank",
            SkipReason::NotShortLink => "not_short_link",
            SkipReason::NotRedirect => "not_redirect",
            SkipReason::ReachedOrigin => "reached_origin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Click(LogRecord),
    Skip(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid log record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns raw log lines into click records for one short-path prefix.
#[derive(Debug, Clone)]
pub struct LineParser {
    prefix: String,
}

impl LineParser {
    /// `prefix` is the path before the code, e.g. `/s/`.
    pub fn new(prefix: &str) -> Self {
        let mut prefix = prefix.trim().to_string();
        if !prefix.starts_with('/') {
            prefix.insert(0, '/');
        }
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { prefix }
    }

    pub fn parse(&self, line: &[u8]) -> Result<ParsedLine, LineError> {
        let text = std::str::from_utf8(line)?.trim();
        if text.is_empty() {
            return Ok(ParsedLine::Skip(SkipReason::Blank));
        }

        let raw: RawLine = serde_json::from_str(text)?;

        let Some(code) = self.code_from_path(&raw.path) else {
            return Ok(ParsedLine::Skip(SkipReason::NotShortLink));
        };

        if !REDIRECT_STATUSES.contains(&raw.status) {
            return Ok(ParsedLine::Skip(SkipReason::NotRedirect));
        }

        let edge_hit = raw
            .cache_status
            .as_deref()
            .is_some_and(|s| s.to_ascii_lowercase().contains("hit"));
        if !edge_hit {
            return Ok(ParsedLine::Skip(SkipReason::ReachedOrigin));
        }

        let query = raw.query.as_deref().filter(|q| *q != "-");

        Ok(ParsedLine::Click(LogRecord {
            code: code.to_string(),
            occurred_at: raw.timestamp,
            user_agent: raw.user_agent.filter(|ua| !ua.is_empty() && ua != "-"),
            event_type: resolution_event_type(query),
        }))
    }

    fn code_from_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(&self.prefix)?;
        let code = rest.strip_suffix('/').unwrap_or(rest);
        is_valid_code(code).then_some(code)
    }
}
