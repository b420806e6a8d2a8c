//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, migrations, background tasks (click worker,
//! access-log watchers, rate-limit pruning) and the Axum server lifecycle.

use crate::config::{Config, StorageBackend};
use crate::domain::audit::TracingAuditSink;
use crate::domain::click_worker::run_click_worker;
use crate::domain::repositories::{CursorRepository, LinkRepository, StatsRepository};
use crate::infrastructure::log_tail::{LineParser, LogWatcher};
use crate::infrastructure::persistence::{
    MemoryStore, PgCursorRepository, PgLinkRepository, PgStatsRepository,
};
use crate::infrastructure::rate_limit::RateLimiter;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

/// How long queued click events may take to flush after the server stops.
const DRAIN_GRACE: Duration = Duration::from_secs(10);
const WATCHER_STOP_GRACE: Duration = Duration::from_secs(5);

/// Storage handles for the selected backend.
pub struct Repositories {
    pub links: Arc<dyn LinkRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub cursors: Arc<dyn CursorRepository>,
}

/// Connects to the configured storage and applies migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_storage(config: &Config) -> Result<Repositories> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Repositories {
                links: store.clone(),
                stats: store.clone(),
                cursors: store,
            })
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .idle_timeout(Duration::from_secs(config.db_idle_timeout))
                .max_lifetime(Duration::from_secs(config.db_max_lifetime))
                .connect(&config.database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to migrate")?;

            let pool = Arc::new(pool);
            Ok(Repositories {
                links: Arc::new(PgLinkRepository::new(pool.clone())),
                stats: Arc::new(PgStatsRepository::new(pool.clone())),
                cursors: Arc::new(PgCursorRepository::new(pool)),
            })
        }
    }
}

/// Runs the HTTP server with the given configuration until a shutdown signal.
///
/// Startup order:
/// - storage and migrations
/// - background click worker
/// - one watcher per access-log source
/// - rate-limit pruning
/// - Axum HTTP server
///
/// On shutdown the server stops accepting requests, watchers get
/// [`WATCHER_STOP_GRACE`] to stop and the click queue is drained for at most
/// [`DRAIN_GRACE`].
///
/// # Errors
///
/// Returns an error if storage setup fails, the server cannot bind, or the
/// server fails at runtime.
pub async fn run(config: Config) -> Result<()> {
    let repos = connect_storage(&config).await?;

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        repos.links.clone(),
        repos.stats.clone(),
        config.click_worker_concurrency,
    ));
    tracing::info!(
        concurrency = config.click_worker_concurrency,
        "Click worker started"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut watchers = JoinSet::new();
    let parser = LineParser::new(&config.short_path_prefix);
    for source in &config.access_log_sources {
        let watcher = LogWatcher::new(
            source.clone(),
            parser.clone(),
            repos.cursors.clone(),
            click_tx.clone(),
            config.watcher_config(),
        );
        watchers.spawn(watcher.run(shutdown_rx.clone()));
    }

    let state = AppState::new(
        repos.links,
        repos.stats,
        Arc::new(TracingAuditSink),
        click_tx,
        config.state_options(),
    );

    let pruner = tokio::spawn(prune_rate_limits(
        vec![
            state.redirect_limiter.clone(),
            state.management_limiter.clone(),
        ],
        Duration::from_secs(config.rate_limit_window_secs),
        shutdown_rx,
    ));

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    let served = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    tracing::info!("HTTP server stopped, shutting down background tasks");
    let _ = shutdown_tx.send(true);

    let stopped = tokio::time::timeout(WATCHER_STOP_GRACE, async {
        while let Some(joined) = watchers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Log watcher task failed");
            }
        }
    })
    .await;
    if stopped.is_err() {
        tracing::warn!(
            grace_secs = WATCHER_STOP_GRACE.as_secs(),
            "Log watchers did not stop in time, aborting them"
        );
        watchers.abort_all();
    }
    let _ = pruner.await;

    // The router and watchers held the last senders; the worker now drains.
    match tokio::time::timeout(DRAIN_GRACE, worker).await {
        Ok(Ok(())) => tracing::info!("Click queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Click worker task failed"),
        Err(_) => tracing::warn!(
            grace_secs = DRAIN_GRACE.as_secs(),
            "Click queue not drained in time, remaining events dropped"
        ),
    }

    served?;
    Ok(())
}

/// Periodically drops elapsed rate-limit windows until shutdown.
async fn prune_rate_limits(
    limiters: Vec<Arc<dyn RateLimiter>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed: usize = limiters.iter().map(|l| l.prune_expired()).sum();
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired rate-limit records");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
