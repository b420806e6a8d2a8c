//! Shared application state injected into all handlers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::services::{LinkService, RedirectService, StatsService};
use crate::domain::audit::AuditSink;
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::infrastructure::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::utils::client_identity::ClientIdentity;
use crate::utils::code_generator::DEFAULT_CODE_LENGTH;

/// Link service over whichever storage backend was selected at startup.
pub type AppLinkService = LinkService<dyn LinkRepository, dyn StatsRepository>;
pub type AppRedirectService = RedirectService<dyn LinkRepository>;
pub type AppStatsService = StatsService<dyn LinkRepository, dyn StatsRepository>;

/// Tunables that shape the state, usually derived from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub base_url: String,
    /// Path segment in front of short codes, e.g. `/s`.
    pub short_path_prefix: String,
    pub code_length: usize,
    pub behind_proxy: bool,
    pub rate_limit_max: u32,
    pub rate_limit_management_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            short_path_prefix: "/s".to_string(),
            code_length: DEFAULT_CODE_LENGTH,
            behind_proxy: true,
            rate_limit_max: 120,
            rate_limit_management_max: 30,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<AppLinkService>,
    pub redirect_service: Arc<AppRedirectService>,
    pub stats_service: Arc<AppStatsService>,
    pub click_sender: mpsc::Sender<ClickEvent>,
    /// Guards `GET /s/{code}` and ad events.
    pub redirect_limiter: Arc<dyn RateLimiter>,
    /// Guards the management and stats API.
    pub management_limiter: Arc<dyn RateLimiter>,
    pub client_identity: Arc<ClientIdentity>,
    pub base_url: String,
    pub short_path_prefix: String,
}

impl AppState {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        stats: Arc<dyn StatsRepository>,
        audit: Arc<dyn AuditSink>,
        click_sender: mpsc::Sender<ClickEvent>,
        options: StateOptions,
    ) -> Self {
        let link_service = LinkService::new(
            links.clone(),
            stats.clone(),
            audit,
            options.code_length,
        );
        let redirect_service = RedirectService::new(links.clone(), click_sender.clone());
        let stats_service = StatsService::new(links, stats);

        Self {
            link_service: Arc::new(link_service),
            redirect_service: Arc::new(redirect_service),
            stats_service: Arc::new(stats_service),
            click_sender,
            redirect_limiter: Arc::new(FixedWindowLimiter::new(
                options.rate_limit_max,
                options.rate_limit_window,
            )),
            management_limiter: Arc::new(FixedWindowLimiter::new(
                options.rate_limit_management_max,
                options.rate_limit_window,
            )),
            client_identity: Arc::new(ClientIdentity::standard(options.behind_proxy)),
            base_url: options.base_url.trim_end_matches('/').to_string(),
            short_path_prefix: options.short_path_prefix,
        }
    }

    /// Public URL of a short code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}{}/{}", self.base_url, self.short_path_prefix, code)
    }
}
