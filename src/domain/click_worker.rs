//! Background worker persisting queued click events.
//!
//! Both capture paths (inline dispatcher, log watcher) feed one bounded
//! channel. The worker drains it with bounded concurrency, retries storage
//! failures with jittered exponential backoff and finally drops the event.
//! Nothing here ever reaches an HTTP response.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::click_event::{ClickEvent, LinkRef};
use crate::domain::entities::NewClick;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;

/// Retries after the first failed attempt.
const MAX_RETRIES: usize = 5;

/// Errors on the ingestion path. Logged and counted, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no link with code {0}")]
    UnknownCode(String),

    #[error("storage failure: {0}")]
    Storage(#[from] AppError),
}

fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(10)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(MAX_RETRIES)
}

fn is_retryable(e: &AppError) -> bool {
    matches!(e, AppError::Internal { .. })
}

/// Tries to hand an event to the worker without waiting.
///
/// A full or closed queue drops the event; the caller never blocks.
pub fn try_enqueue(sender: &mpsc::Sender<ClickEvent>, event: ClickEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => {
            metrics::counter!("clicks_enqueued_total").increment(1);
            true
        }
        Err(e) => {
            metrics::counter!("clicks_dropped_total").increment(1);
            warn!(error = %e, "Click queue unavailable, event dropped");
            false
        }
    }
}

/// Consumes click events until every sender is dropped.
///
/// At most `concurrency` events are persisted at the same time. Returns after
/// in-flight events finish, so awaiting the returned future drains the queue.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    links: Arc<dyn LinkRepository>,
    stats: Arc<dyn StatsRepository>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let links = links.clone();
        let stats = stats.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            process_event(event, links.as_ref(), stats.as_ref()).await;
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("Click worker stopped");
}

/// Persists one event and records the outcome in logs and metrics.
pub async fn process_event(
    event: ClickEvent,
    links: &dyn LinkRepository,
    stats: &dyn StatsRepository,
) {
    let source = event.source.as_str();

    match persist(event, links, stats).await {
        Ok(true) => {
            metrics::counter!("clicks_persisted_total", "source" => source).increment(1);
        }
        Ok(false) => {
            debug!(source, "Duplicate ingest key, event already stored");
            metrics::counter!("clicks_duplicate_total", "source" => source).increment(1);
        }
        Err(IngestError::UnknownCode(code)) => {
            debug!(source, code, "Skipping event for unknown code");
            metrics::counter!("clicks_failed_total", "reason" => "unknown_code").increment(1);
        }
        Err(e) => {
            error!(source, error = %e, "Dropping click event after retries");
            metrics::counter!("clicks_failed_total", "reason" => "storage").increment(1);
        }
    }
}

async fn persist(
    event: ClickEvent,
    links: &dyn LinkRepository,
    stats: &dyn StatsRepository,
) -> Result<bool, IngestError> {
    let link_id = match event.link {
        LinkRef::Id(id) => id,
        LinkRef::Code(code) => {
            let found = RetryIf::spawn(
                retry_strategy(),
                || links.find_by_code(&code),
                is_retryable,
            )
            .await?;

            match found {
                Some(link) => link.id,
                None => return Err(IngestError::UnknownCode(code)),
            }
        }
    };

    let new_click = NewClick {
        link_id,
        occurred_at: event.occurred_at,
        user_agent: event.user_agent,
        event_type: event.event_type,
        source: event.source,
        ingest_key: event.ingest_key,
    };

    let inserted = RetryIf::spawn(
        retry_strategy(),
        || {
            let attempt = new_click.clone();
            async move {
                let result = stats.record_click(attempt).await;
                if let Err(e) = &result {
                    warn!(error = %e, "Click insert failed");
                }
                result
            }
        },
        is_retryable,
    )
    .await?;

    Ok(inserted)
}
