//! Client identity resolution for rate limiting and audit.
//!
//! Identity comes from an ordered list of sources; the first one yielding a
//! non-empty value wins, otherwise [`UNKNOWN_CLIENT`] is used.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identity used when no source yields a value.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// One place a client identity can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// First hop of `X-Forwarded-For`.
    ForwardedFor,
    /// `X-Real-IP`.
    RealIp,
    /// Socket peer address of the connection.
    PeerAddress,
}

impl IdentitySource {
    fn extract(self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        let value = match self {
            Self::ForwardedFor => headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string()),
            Self::RealIp => headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string()),
            Self::PeerAddress => peer.map(|addr| addr.ip().to_string()),
        };

        value.filter(|s| !s.is_empty())
    }
}

/// Ordered chain of identity sources.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    sources: Vec<IdentitySource>,
}

impl ClientIdentity {
    pub fn new(sources: Vec<IdentitySource>) -> Self {
        Self { sources }
    }

    /// Default chain. Forwarded headers are only trusted behind a proxy.
    pub fn standard(behind_proxy: bool) -> Self {
        if behind_proxy {
            Self::new(vec![
                IdentitySource::ForwardedFor,
                IdentitySource::RealIp,
                IdentitySource::PeerAddress,
            ])
        } else {
            Self::new(vec![IdentitySource::PeerAddress])
        }
    }

    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        self.sources
            .iter()
            .find_map(|source| source.extract(headers, peer))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.1.2.3:55000".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let identity = ClientIdentity::standard(true);
        assert_eq!(identity.resolve(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_used_without_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let identity = ClientIdentity::standard(true);
        assert_eq!(identity.resolve(&headers, peer()), "198.51.100.2");
    }

    #[test]
    fn test_empty_header_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));

        let identity = ClientIdentity::standard(true);
        assert_eq!(identity.resolve(&headers, peer()), "10.1.2.3");
    }

    #[test]
    fn test_sentinel_when_nothing_matches() {
        let identity = ClientIdentity::standard(true);
        assert_eq!(identity.resolve(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_direct_mode_ignores_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let identity = ClientIdentity::standard(false);
        assert_eq!(identity.resolve(&headers, peer()), "10.1.2.3");
    }
}
