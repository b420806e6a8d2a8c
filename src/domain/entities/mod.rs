//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`Link`] - A short code mapped to a target URL
//! - [`Click`] - A stored click event on a link
//! - [`LogCursor`] - Read position of a tailed access log
//!
//! Creation uses separate input structs (`NewLink`, `NewClick`) and partial
//! updates use [`LinkPatch`].

pub mod click;
pub mod cursor;
pub mod link;

pub use click::{Click, ClickSource, EventType, NewClick};
pub use cursor::LogCursor;
pub use link::{Link, LinkPatch, NewLink};
