//! Business logic services for the application layer.

pub mod link_service;
pub mod redirect_service;
pub mod stats_service;

pub use link_service::{CreateLink, LinkPage, LinkService, UpdateLink};
pub use redirect_service::{AdKind, RedirectService, Resolution};
pub use stats_service::{LinkStats, StatsService, Summary};
