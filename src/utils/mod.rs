//! Helpers shared across layers.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`client_identity`] - Client identity for rate limiting and audit
//! - [`password`] - Argon2 hashing for protected links
//! - [`target_url`] - Redirect target validation

pub mod client_identity;
pub mod code_generator;
pub mod password;
pub mod target_url;
