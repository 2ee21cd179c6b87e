// Periodic background workers sharing one stop signal

use crate::config::MAX_PERIOD_SECS;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run counters for one worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    run_count: AtomicU64,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl WorkerStats {
    fn record(&self, at: DateTime<Utc>) {
        self.run_count.fetch_add(1, Ordering::Relaxed);
        *self.last_run.lock() = Some(at);
    }

    pub fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::Relaxed)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock()
    }
}

/// Point-in-time view of one worker's stats
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub name: &'static str,
    pub period_secs: u64,
    pub run_count: u64,
    pub last_run: Option<DateTime<Utc>>,
}

/// Outcome of `WorkerGroup::shutdown`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub workers: usize,
    /// Workers that exited before the deadline
    pub stopped: usize,
    pub timed_out: bool,
}

struct Worker {
    name: &'static str,
    period: Duration,
    stats: Arc<WorkerStats>,
    handle: JoinHandle<()>,
}

/// A set of periodic tasks stopped together
///
/// Each worker ticks on its own interval and never overlaps itself; missed
/// ticks are skipped rather than bunched. Must be used inside a tokio runtime.
pub struct WorkerGroup {
    token: CancellationToken,
    workers: Vec<Worker>,
}

impl WorkerGroup {
    /// Empty group with a fresh stop signal
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            workers: Vec::new(),
        }
    }

    /// Stop signal shared by every worker in the group
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `tick` every `period`, first run one period from now
    ///
    /// The period is clamped to between one millisecond and one year.
    pub fn spawn_periodic<F>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.clamp(Duration::from_millis(1), Duration::from_secs(MAX_PERIOD_SECS));
        let token = self.token.clone();
        let stats = Arc::new(WorkerStats::default());
        let worker_stats = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(worker = name, period_secs = period.as_secs(), "Worker started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tick();
                        worker_stats.record(Utc::now());
                    }
                }
            }

            info!(worker = name, runs = worker_stats.run_count(), "Worker stopped");
        });

        self.workers.push(Worker {
            name,
            period,
            stats,
            handle,
        });
    }

    /// Number of spawned workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Run counters in spawn order
    pub fn stats(&self) -> Vec<WorkerStatus> {
        self.workers
            .iter()
            .map(|w| WorkerStatus {
                name: w.name,
                period_secs: w.period.as_secs(),
                run_count: w.stats.run_count(),
                last_run: w.stats.last_run(),
            })
            .collect()
    }

    /// Signal every worker and wait up to `timeout` for them to exit
    ///
    /// Workers still running at the deadline are aborted.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownReport {
        let total = self.workers.len();
        self.token.cancel();

        let mut names = Vec::with_capacity(total);
        let mut aborts = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);
        for worker in self.workers {
            names.push(worker.name);
            aborts.push(worker.handle.abort_handle());
            handles.push(worker.handle);
        }

        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(results) => {
                let mut stopped = 0;
                for (name, result) in names.iter().zip(results) {
                    match result {
                        Ok(()) => stopped += 1,
                        Err(e) => warn!(worker = *name, error = %e, "Worker ended abnormally"),
                    }
                }
                info!(workers = total, stopped, "Workers shut down");
                ShutdownReport {
                    workers: total,
                    stopped,
                    timed_out: false,
                }
            }
            Err(_) => {
                let stopped = aborts.iter().filter(|a| a.is_finished()).count();
                warn!(
                    workers = total,
                    stopped,
                    timeout_secs = timeout.as_secs(),
                    "Shutdown deadline passed, aborting remaining workers"
                );
                for abort in aborts {
                    abort.abort();
                }
                debug!("Remaining workers aborted");
                ShutdownReport {
                    workers: total,
                    stopped,
                    timed_out: true,
                }
            }
        }
    }
}

impl Default for WorkerGroup {
    fn default() -> Self {
        Self::new()
    }
}
