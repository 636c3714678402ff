//! The adaptive throttled transfer engine shared by backup and restore.
//!
//! One insertion-ordered queue of remote paths, a dispatcher that starts at
//! most one transfer per invocation, a global pause barrier honouring server
//! rate limiting, and per-path failure accounting. Scheduling is cooperative:
//! concurrency comes from overlapping transfers on the tokio runtime, never
//! from extra threads, and every piece of shared state is serialized on a
//! single mutex that is never held across an await point.

pub mod pause;
pub mod queue;
pub mod retry_after;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, ORIGIN, USER_AGENT};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::fs::walker;
use crate::transfer::progress::{format_bytes, format_duration, RunStats};
use crate::transfer::{self, Disposition};
use crate::utils::errors::BackupError;
use crate::Result;
use pause::PauseBarrier;
use queue::WorkQueue;

/// Give up on a path after this many transient failures.
const MAX_FAILURES: u32 = 3;

/// A pause longer than this means the server wants us gone; abandon the run.
const MAX_PAUSE: Duration = Duration::from_secs(3600);

/// Ramp-up delay between dispatcher launches; doubles as a rate cap of at
/// most 1000 launches per second.
const RAMP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Backup,
    Restore,
}

impl Mode {
    /// Growth factor applied to the fallback retry delay on each use.
    fn retry_growth(self) -> f64 {
        match self {
            Mode::Backup => 2.0,
            Mode::Restore => 1.5,
        }
    }

    fn timer_label(self) -> &'static str {
        match self {
            Mode::Backup => "total download time",
            Mode::Restore => "total upload time",
        }
    }
}

struct EngineState {
    queue: WorkQueue,
    failed: BTreeSet<String>,
    default_retry_after: Duration,
}

pub struct Engine {
    pub(crate) config: RunConfig,
    pub(crate) mode: Mode,
    pub(crate) client: reqwest::Client,
    pub(crate) stats: RunStats,
    state: Mutex<EngineState>,
    pause: PauseBarrier,
    abandoned: CancellationToken,
    done: watch::Sender<bool>,
    weak: Weak<Engine>,
}

impl Engine {
    pub fn new(config: RunConfig, mode: Mode) -> Result<Arc<Self>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.token), "token")?,
        );
        headers.insert(USER_AGENT, header_value(&RunConfig::user_agent(), "user agent")?);
        headers.insert(ORIGIN, header_value(&config.origin, "origin")?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let (done, _) = watch::channel(false);
        let initial_retry_after = config.initial_retry_after;
        Ok(Arc::new_cyclic(|weak| Self {
            config,
            mode,
            client,
            stats: RunStats::new(),
            state: Mutex::new(EngineState {
                queue: WorkQueue::new(),
                failed: BTreeSet::new(),
                default_retry_after: initial_retry_after,
            }),
            pause: PauseBarrier::new(),
            abandoned: CancellationToken::new(),
            done,
            weak: weak.clone(),
        }))
    }

    /// Seed the queue, drive it dry, report. Returns the process exit code:
    /// 0 on completion (even with failed paths), 2 when the run was
    /// abandoned before the queue could drain normally.
    pub async fn run(&self) -> Result<i32> {
        let started = Instant::now();

        match self.mode {
            Mode::Backup => {
                if let Some(stashed) = crate::fs::stash_previous(&self.config.backup_dir)? {
                    info!("moved previous backup aside to {}", stashed.display());
                }
                for seed in seed_paths(self.config.category.as_deref(), self.config.include_public)
                {
                    self.enqueue(seed, None);
                }
            }
            Mode::Restore => walker::seed_restore_queue(self).await?,
        }

        let queued = self.queue_len();
        info!(
            "{} paths queued; running up to {} transfers at once",
            queued, self.config.simultaneous
        );

        if queued > 0 {
            let mut done = self.done.subscribe();
            self.schedule_dispatch(None);
            let _ = done.wait_for(|finished| *finished).await;
        }

        self.report_completion(started);
        Ok(if self.abandoned.is_cancelled() { 2 } else { 0 })
    }

    /// Add a path to the work queue. Re-enqueueing an existing path leaves
    /// the entry untouched (first write wins, including metadata); once the
    /// run is abandoned this is a logged no-op.
    pub fn enqueue(&self, path: String, metadata: Option<HashMap<String, String>>) {
        if self.abandoned.is_cancelled() {
            error!("not queueing {}: the run is abandoned", path);
            return;
        }
        let mut state = self.state.lock();
        if !state.queue.insert(path.clone(), metadata) {
            warn!("{} is already queued", path);
        }
    }

    /// Stop launching new transfers, fail everything idle, and let in-flight
    /// transfers finish naturally.
    pub fn abandon_gracefully(&self) {
        if self.abandoned.is_cancelled() {
            return;
        }
        warn!("abandoning the run: no new transfers will start");
        self.abandoned.cancel();

        let mut state = self.state.lock();
        for path in state.queue.drain_idle() {
            state.failed.insert(path);
        }
        let finished = state.queue.is_empty();
        drop(state);

        if finished {
            let _ = self.done.send(true);
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.is_cancelled()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn queued_paths(&self) -> Vec<String> {
        self.state.lock().queue.paths()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().queue.in_flight_count()
    }

    pub fn failed_paths(&self) -> Vec<String> {
        self.state.lock().failed.iter().cloned().collect()
    }

    /// Saved metadata of a queued path, if any. Mostly useful to tests.
    pub fn entry_metadata(&self, path: &str) -> Option<HashMap<String, String>> {
        self.state
            .lock()
            .queue
            .get_mut(path)
            .and_then(|entry| entry.metadata.clone())
    }

    /// Current fallback delay used when `Retry-After` is absent or unusable.
    pub fn default_retry_after(&self) -> Duration {
        self.state.lock().default_retry_after
    }

    fn schedule_dispatch(&self, delay: Option<Duration>) {
        let Some(engine) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            engine.dispatch().await;
        });
    }

    /// One dispatcher iteration: scan the queue once and start at most one
    /// new transfer.
    async fn dispatch(&self) {
        self.pause.wait().await;

        let Some((path, metadata)) = self.claim_next() else {
            return;
        };

        let disposition = match self.mode {
            Mode::Backup => transfer::fetch::transfer(self, &path).await,
            Mode::Restore => transfer::put::transfer(self, &path, metadata.as_ref()).await.0,
        };

        self.settle(&path, disposition);
    }

    /// Scan in insertion order; pick the first path with no transfer running
    /// unless the simultaneous limit is already reached. While still below
    /// the limit after claiming, another dispatch is scheduled on the ramp
    /// timer so parallelism keeps filling up without bursting.
    fn claim_next(&self) -> Option<(String, Option<HashMap<String, String>>)> {
        let limit = self.config.simultaneous.max(1);
        let mut state = self.state.lock();

        let mut in_flight = 0usize;
        let mut candidate: Option<String> = None;
        for (path, entry) in state.queue.iter() {
            if entry.in_flight {
                in_flight += 1;
            } else if candidate.is_none() {
                candidate = Some(path.to_string());
            }
            if in_flight >= limit && candidate.is_some() {
                break;
            }
        }

        let path = candidate?;
        if in_flight >= limit {
            return None;
        }
        if in_flight + 1 < limit {
            self.schedule_dispatch(Some(RAMP_INTERVAL));
        }

        let entry = state.queue.get_mut(&path)?;
        entry.in_flight = true;
        let metadata = entry.metadata.clone();
        Some((path, metadata))
    }

    /// Apply the outcome of a finished transfer to the queue, then schedule
    /// the next dispatcher iteration.
    fn settle(&self, path: &str, disposition: Disposition) {
        match &disposition {
            Disposition::Overloaded { retry_after } => {
                let pause = self.next_pause(retry_after.as_deref());
                if pause > MAX_PAUSE {
                    error!(
                        "server asked us to wait {}; abandoning the run",
                        format_duration(pause)
                    );
                    self.abandon_gracefully();
                }
                debug!("pausing all transfer launches for {} ms", pause.as_millis());
                self.pause.pause_for(pause);
            }
            Disposition::Fatal => self.abandon_gracefully(),
            _ => {}
        }

        let mut state = self.state.lock();
        match disposition {
            Disposition::Complete => {
                state.queue.remove(path);
            }
            Disposition::PermanentFailure | Disposition::Fatal => {
                state.queue.remove(path);
                state.failed.insert(path.to_string());
            }
            Disposition::Overloaded { .. } | Disposition::RetryWithoutCount => {
                state.queue.move_to_end(path);
            }
            Disposition::RetryCounted => {
                if let Some(entry) = state.queue.get_mut(path) {
                    entry.failures += 1;
                }
                state.queue.move_to_end(path);
            }
        }

        let give_up = match state.queue.get_mut(path) {
            Some(entry) => {
                if entry.failures >= MAX_FAILURES {
                    warn!("giving up on {} after {} failures", path, entry.failures);
                    true
                } else if self.abandoned.is_cancelled() {
                    true
                } else {
                    entry.in_flight = false;
                    false
                }
            }
            None => false,
        };
        if give_up {
            state.queue.remove(path);
            state.failed.insert(path.to_string());
        }

        let finished = state.queue.is_empty();
        drop(state);

        if finished {
            let _ = self.done.send(true);
            return;
        }
        self.schedule_dispatch(None);
    }

    /// Delay for a 429/503. Prefers the server-supplied header; otherwise
    /// uses the per-process default, which grows on every fallback use.
    fn next_pause(&self, retry_after: Option<&str>) -> Duration {
        if let Some(delay) = retry_after.and_then(retry_after::parse) {
            return delay;
        }
        let mut state = self.state.lock();
        let current = state.default_retry_after;
        state.default_retry_after = current.mul_f64(self.mode.retry_growth());
        current
    }

    fn report_completion(&self, started: Instant) {
        info!(
            "{}: {}",
            self.mode.timer_label(),
            format_duration(started.elapsed())
        );
        info!(
            "transferred {} documents ({})",
            self.stats.documents(),
            format_bytes(self.stats.bytes())
        );

        let failed = self.failed_paths();
        if !failed.is_empty() {
            warn!("gave up on {} paths:", failed.len());
            for path in &failed {
                warn!("  {}", path);
            }
        }
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| BackupError::Config(format!("{what} is not a valid header value")))
}

/// Starting folders for a backup walk.
pub fn seed_paths(category: Option<&str>, include_public: bool) -> Vec<String> {
    match category {
        None => vec!["/".to_string()],
        Some(category) => {
            let mut seeds = vec![format!("/{category}/")];
            if include_public && category != "public" {
                seeds.push(format!("/public/{category}/"));
            }
            seeds
        }
    }
}
