//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for input validation.

pub mod ad;
pub mod health;
pub mod link;
pub mod pagination;
pub mod stats;
pub mod update_link;
