//! Short code generation and validation.
//!
//! Codes are drawn from the 62 ASCII alphanumerics using OS entropy. Storage
//! uniqueness is not checked here; see
//! [`crate::application::services::LinkService`] for allocation.

use crate::error::AppError;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

pub const DEFAULT_CODE_LENGTH: usize = 6;
pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 20;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{4,20}$").expect("valid code regex"));

/// Words that collide with system routes. Compared case-insensitively.
const RESERVED_CODES: &[&str] = &[
    "api",
    "admin",
    "health",
    "status",
    "links",
    "urls",
    "edit",
    "analytics",
    "stats",
    "docs",
    "static",
    "public",
    "assets",
    "images",
    "css",
    "js",
    "fonts",
    "qrcodes",
    "login",
    "dashboard",
    "favicon",
    "robots",
];

/// Generates a random code of exactly `length` characters.
///
/// Each character comes from one random byte mapped onto the alphabet by
/// modulo. `length` is clamped to the valid code length range, and reserved
/// words are redrawn, so every result passes [`is_valid_code`] and
/// [`is_reserved`] is false for it.
///
/// # Panics
///
/// Panics if the system random number generator fails.
pub fn generate_code(length: usize) -> String {
    let length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
    let mut buffer = vec![0u8; length];

    loop {
        getrandom::fill(&mut buffer).expect("Failed to generate random bytes");

        let code: String = buffer
            .iter()
            .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
            .collect();

        if !is_reserved(&code) {
            return code;
        }
    }
}

/// Returns true iff `code` matches `^[A-Za-z0-9]{4,20}$`.
pub fn is_valid_code(code: &str) -> bool {
    CODE_REGEX.is_match(code)
}

/// Returns true if `code` is a reserved route word, ignoring case.
pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
}

/// Validates a user-provided custom code.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if the code does not match the pattern.
/// Returns [`AppError::Conflict`] if the code is a reserved word.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if !is_valid_code(code) {
        return Err(AppError::bad_request(
            "Custom code must be 4-20 alphanumeric characters",
            json!({ "code": code, "provided_length": code.len() }),
        ));
    }

    if is_reserved(code) {
        return Err(AppError::conflict(
            "This code is reserved",
            json!({ "code": code }),
        ));
    }

    Ok(())
}
