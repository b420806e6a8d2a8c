//! Background task tailing one access-log source.
//!
//! The watcher reads complete lines, pushes click events into the shared
//! click channel and commits a durable cursor after every batch. It follows
//! rotation (the path now names a different file) and truncation (the same
//! file shrank below the cursor). Malformed lines are logged and skipped.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::file_identity::{FileIdentity, OpenedFile, open_identified, rotated_path};
use super::parser::{LineParser, ParsedLine};
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::LogCursor;
use crate::domain::repositories::CursorRepository;
use crate::error::AppError;

const READ_CHUNK_BYTES: usize = 64 * 1024;
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A named log file to tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// Sleep after reaching end of file.
    pub poll_interval: Duration,
    /// Ceiling for the error backoff.
    pub max_backoff: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cursor store error: {0}")]
    Cursor(#[from] AppError),
}

/// Open file and read position. `offset` always points just past the last
/// complete line handed to the parser.
struct TailState {
    file: tokio::fs::File,
    identity: FileIdentity,
    offset: u64,
    pending: Vec<u8>,
    discarding: bool,
}

impl TailState {
    async fn start_at(opened: OpenedFile, offset: u64) -> std::io::Result<Self> {
        let mut file = opened.file;
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        Ok(Self {
            file,
            identity: opened.identity,
            offset,
            pending: Vec::new(),
            discarding: false,
        })
    }
}

/// Why a watcher stopped before reaching the end of its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    SinkClosed,
    Shutdown,
}

enum ReadOutcome {
    Lines,
    Eof,
    Halted(Halt),
}

enum Resume {
    Ready(TailState),
    NotReady,
    Halted(Halt),
}

enum Tick {
    Progress,
    Idle,
    Waiting,
    Halted(Halt),
}

/// Resolves once shutdown is requested. A dropped sender counts as a request.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Exponential delay capped at `max`, plus up to 25% jitter.
    fn next_delay(&mut self) -> Duration {
        use rand::Rng;

        self.attempt = self.attempt.saturating_add(1);
        let base_ms = self.base.as_millis() as u64;
        let exp = base_ms.saturating_mul(2u64.saturating_pow(self.attempt - 1));
        let capped = exp.min(self.max.as_millis() as u64);
        let jitter = rand::rng().random_range(0..=capped / 4);

        Duration::from_millis(capped.saturating_add(jitter))
    }
}

pub struct LogWatcher {
    source: LogSource,
    parser: LineParser,
    cursors: Arc<dyn CursorRepository>,
    sink: mpsc::Sender<ClickEvent>,
    config: WatcherConfig,
}

impl LogWatcher {
    pub fn new(
        source: LogSource,
        parser: LineParser,
        cursors: Arc<dyn CursorRepository>,
        sink: mpsc::Sender<ClickEvent>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            source,
            parser,
            cursors,
            sink,
            config,
        }
    }

    /// Tails the source until `shutdown` flips to `true` or the click channel closes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = %self.source.name,
            path = %self.source.path.display(),
            "Log watcher started"
        );

        let mut state: Option<TailState> = None;
        let mut backoff = Backoff::new(self.config.poll_interval, self.config.max_backoff);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.tick(&mut state, &mut shutdown).await {
                Ok(Tick::Progress) => {
                    backoff.reset();
                    None
                }
                Ok(Tick::Idle) => {
                    backoff.reset();
                    Some(self.config.poll_interval)
                }
                Ok(Tick::Waiting) => {
                    debug!(source = %self.source.name, "Log file not available yet");
                    Some(backoff.next_delay())
                }
                Ok(Tick::Halted(Halt::SinkClosed)) => {
                    info!(source = %self.source.name, "Click channel closed");
                    break;
                }
                Ok(Tick::Halted(Halt::Shutdown)) => {
                    debug!(source = %self.source.name, "Shutdown while the click queue was full");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        source = %self.source.name,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Log watcher error, reopening from the last cursor"
                    );
                    state = None;
                    Some(delay)
                }
            };

            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_requested(&mut shutdown) => break,
                }
            }
        }

        info!(source = %self.source.name, "Log watcher stopped");
    }

    async fn tick(
        &self,
        state: &mut Option<TailState>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Tick, WatchError> {
        let Some(tail) = state.as_mut() else {
            return match self.resume(shutdown).await? {
                Resume::Ready(tail) => {
                    *state = Some(tail);
                    Ok(Tick::Progress)
                }
                Resume::NotReady => Ok(Tick::Waiting),
                Resume::Halted(halt) => Ok(Tick::Halted(halt)),
            };
        };

        match self.read_batch(tail, shutdown).await? {
            ReadOutcome::Lines => Ok(Tick::Progress),
            ReadOutcome::Halted(halt) => Ok(Tick::Halted(halt)),
            ReadOutcome::Eof => self.follow(state, shutdown).await,
        }
    }

    /// Opens the live file at the stored cursor.
    ///
    /// If the cursor names a file that was rotated away while the watcher was
    /// down, the rotated file is drained from the cursor first.
    async fn resume(&self, shutdown: &mut watch::Receiver<bool>) -> Result<Resume, WatchError> {
        let cursor = self.cursors.load(&self.source.name).await?;

        let Some(live) = open_identified(&self.source.path).await? else {
            return Ok(Resume::NotReady);
        };

        let Some(cursor) = cursor else {
            info!(source = %self.source.name, "No cursor stored, reading from the start");
            return Ok(Resume::Ready(TailState::start_at(live, 0).await?));
        };

        let stored_offset = u64::try_from(cursor.offset).unwrap_or(0);

        if cursor.file_id == live.identity.as_str() {
            let offset = if live.len < stored_offset {
                warn!(source = %self.source.name, "Log file truncated while stopped, restarting at 0");
                0
            } else {
                stored_offset
            };
            info!(source = %self.source.name, offset, "Resuming from cursor");
            return Ok(Resume::Ready(TailState::start_at(live, offset).await?));
        }

        let rotated = rotated_path(&self.source.path);
        match open_identified(&rotated).await? {
            Some(old) if cursor.file_id == old.identity.as_str() => {
                info!(
                    source = %self.source.name,
                    path = %rotated.display(),
                    offset = stored_offset,
                    "Draining rotated file before the live one"
                );
                let mut old_tail = TailState::start_at(old, stored_offset).await?;
                if let Some(halt) = self.drain(&mut old_tail, shutdown).await? {
                    return Ok(Resume::Halted(halt));
                }
            }
            _ => {
                warn!(
                    source = %self.source.name,
                    file_id = %cursor.file_id,
                    "Stored cursor matches no file, starting the live file from the top"
                );
            }
        }

        let tail = TailState::start_at(live, 0).await?;
        self.commit(&tail).await;
        Ok(Resume::Ready(tail))
    }

    /// Handles end of file: switches to a rotated-in file or restarts a truncated one.
    async fn follow(
        &self,
        state: &mut Option<TailState>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Tick, WatchError> {
        let Some(tail) = state.as_mut() else {
            return Ok(Tick::Waiting);
        };

        let Some(live) = open_identified(&self.source.path).await? else {
            return Ok(Tick::Idle);
        };

        if live.identity == tail.identity {
            if live.len >= tail.offset {
                return Ok(Tick::Idle);
            }

            warn!(source = %self.source.name, "Log file truncated, restarting at 0");
            *tail = TailState::start_at(live, 0).await?;
            self.commit(tail).await;
            return Ok(Tick::Progress);
        }

        if let Some(halt) = self.drain(tail, shutdown).await? {
            return Ok(Tick::Halted(halt));
        }
        if !tail.pending.is_empty() {
            warn!(
                source = %self.source.name,
                bytes = tail.pending.len(),
                "Discarding unterminated last line of rotated file"
            );
        }

        info!(
            source = %self.source.name,
            file_id = %live.identity.as_str(),
            "Log rotation detected, switching files"
        );
        let next = TailState::start_at(live, 0).await?;
        self.commit(&next).await;
        *state = Some(next);

        Ok(Tick::Progress)
    }

    /// Reads a file to its current end, or until the watcher has to stop.
    async fn drain(
        &self,
        tail: &mut TailState,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<Halt>, WatchError> {
        loop {
            match self.read_batch(tail, shutdown).await? {
                ReadOutcome::Lines => continue,
                ReadOutcome::Eof => return Ok(None),
                ReadOutcome::Halted(halt) => return Ok(Some(halt)),
            }
        }
    }

    /// Reads one chunk and hands its complete lines to the parser.
    ///
    /// On a halt the cursor is committed up to the first line that was not
    /// enqueued, so a restart reads that line again.
    async fn read_batch(
        &self,
        tail: &mut TailState,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<ReadOutcome, WatchError> {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        let n = tail.file.read(&mut chunk).await?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }

        let mut data = &chunk[..n];

        if tail.discarding {
            match data.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    tail.offset += (pos + 1) as u64;
                    tail.discarding = false;
                    data = &data[pos + 1..];
                }
                None => {
                    tail.offset += n as u64;
                    return Ok(ReadOutcome::Lines);
                }
            }
        }

        tail.pending.extend_from_slice(data);

        let mut consumed = 0;
        while let Some(pos) = tail.pending[consumed..].iter().position(|b| *b == b'\n') {
            let line_offset = tail.offset + consumed as u64;
            let line = &tail.pending[consumed..consumed + pos];

            if let Err(halt) = self
                .handle_line(line, &tail.identity, line_offset, shutdown)
                .await
            {
                tail.pending.drain(..consumed);
                tail.offset += consumed as u64;
                self.commit(tail).await;
                return Ok(ReadOutcome::Halted(halt));
            }
            consumed += pos + 1;
        }

        tail.pending.drain(..consumed);
        tail.offset += consumed as u64;

        if tail.pending.len() > MAX_LINE_BYTES {
            warn!(
                source = %self.source.name,
                offset = tail.offset,
                "Log line exceeds {MAX_LINE_BYTES} bytes, skipping it"
            );
            metrics::counter!("log_tail_lines_total", "outcome" => "malformed").increment(1);
            tail.offset += tail.pending.len() as u64;
            tail.pending.clear();
            tail.discarding = true;
        }

        self.commit(tail).await;
        Ok(ReadOutcome::Lines)
    }

    /// Enqueues the line's click, if any. A full queue blocks until there is
    /// room or shutdown is requested.
    async fn handle_line(
        &self,
        line: &[u8],
        identity: &FileIdentity,
        offset: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), Halt> {
        match self.parser.parse(line) {
            Ok(ParsedLine::Click(record)) => {
                let ingest_key = format!("{}:{}:{}", self.source.name, identity.as_str(), offset);
                let event = ClickEvent::from_log(
                    record.code,
                    record.occurred_at,
                    record.user_agent,
                    record.event_type,
                    ingest_key,
                );

                tokio::select! {
                    biased;
                    _ = shutdown_requested(shutdown) => return Err(Halt::Shutdown),
                    sent = self.sink.send(event) => {
                        if sent.is_err() {
                            return Err(Halt::SinkClosed);
                        }
                    }
                }
                metrics::counter!("log_tail_lines_total", "outcome" => "ingested").increment(1);
            }
            Ok(ParsedLine::Skip(reason)) => {
                debug!(source = %self.source.name, offset, reason = reason.as_str(), "Skipping log line");
                metrics::counter!("log_tail_lines_total", "outcome" => "skipped").increment(1);
            }
            Err(e) => {
                warn!(source = %self.source.name, offset, error = %e, "Skipping malformed log line");
                metrics::counter!("log_tail_lines_total", "outcome" => "malformed").increment(1);
            }
        }

        Ok(())
    }

    async fn commit(&self, tail: &TailState) {
        let cursor = LogCursor {
            source: self.source.name.clone(),
            file_id: tail.identity.as_str().to_string(),
            offset: tail.offset as i64,
            updated_at: Utc::now(),
        };

        if let Err(e) = self.cursors.save(&cursor).await {
            warn!(source = %self.source.name, error = %e, "Failed to commit log cursor");
        }
    }
}
