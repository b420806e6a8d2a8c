//! Target URL validation and canonical form.

use serde_json::json;
use url::Url;

use crate::error::AppError;

pub const MAX_TARGET_URL_LENGTH: usize = 2048;

/// Parses and canonicalizes a redirect target.
///
/// Only `http` and `https` URLs with a host are accepted. The host is
/// lowercased, the fragment and a default port are removed, and the path and
/// query keep their case.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for anything that is not an absolute
/// http(s) URL within [`MAX_TARGET_URL_LENGTH`].
pub fn normalize_target_url(input: &str) -> Result<String, AppError> {
    let input = input.trim();

    if input.len() > MAX_TARGET_URL_LENGTH {
        return Err(AppError::bad_request(
            "Target URL is too long",
            json!({ "max_length": MAX_TARGET_URL_LENGTH }),
        ));
    }

    let mut url = Url::parse(input).map_err(|e| {
        AppError::bad_request("Invalid target URL", json!({ "reason": e.to_string() }))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::bad_request(
            "Only http and https targets are allowed",
            json!({ "scheme": url.scheme() }),
        ));
    }

    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return Err(AppError::bad_request(
            "Target URL must have a host",
            json!({}),
        ));
    };

    url.set_host(Some(&host))
        .map_err(|e| {
            AppError::bad_request("Invalid target host", json!({ "reason": e.to_string() }))
        })?;
    url.set_fragment(None);

    if matches!((url.scheme(), url.port()), ("http", Some(80)) | ("https", Some(443))) {
        let _ = url.set_port(None);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_host_only() {
        assert_eq!(
            normalize_target_url("HTTPS://Example.COM/Some/Path?Q=A").unwrap(),
            "https://example.com/Some/Path?Q=A"
        );
    }

    #[test]
    fn test_strips_fragment_and_default_port() {
        assert_eq!(
            normalize_target_url("http://example.com:80/page#top").unwrap(),
            "http://example.com/page"
        );
        assert_eq!(
            normalize_target_url("https://example.com:443").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_keeps_custom_port() {
        assert_eq!(
            normalize_target_url("https://example.com:8443/x").unwrap(),
            "https://example.com:8443/x"
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        for input in ["javascript:alert(1)", "ftp://example.com", "file:///etc/passwd"] {
            assert!(
                matches!(normalize_target_url(input), Err(AppError::Validation { .. })),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_garbage_and_oversized() {
        assert!(normalize_target_url("not a url").is_err());
        assert!(normalize_target_url("").is_err());

        let long = format!("https://example.com/{}", "a".repeat(MAX_TARGET_URL_LENGTH));
        assert!(normalize_target_url(&long).is_err());
    }
}
