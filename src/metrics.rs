//! Per-instance execution metrics.
//!
//! One [`ExecutionMetrics`] is owned by the launcher for the lifetime of its
//! instance and shared by `Arc`. Counters only increase; gauges reflect the
//! current instance state and return to baseline when the instance stops.
//!
//! Counter updates ride on launcher/driver transitions that may run on a
//! different task than the one observing a result, so readers must treat
//! counter visibility as eventually consistent with a just-observed
//! completion and poll with bounded backoff where that matters.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct ExecutionMetrics {
    launched: AtomicU64,
    completed: AtomicU64,
    committed: AtomicU64,
    failed: AtomicU64,
    running: AtomicI64,
    up: AtomicBool,
    started_at: Mutex<Option<Instant>>,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total runs started through an execution driver.
    pub fn num_jobs_launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    /// Total runs that reached a terminal state, successful or not.
    pub fn num_jobs_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Total runs whose post-commit resolution was successful.
    pub fn num_jobs_committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    /// Total runs whose post-commit resolution was a failure.
    pub fn num_jobs_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Runs currently between start and completion.
    pub fn num_jobs_running(&self) -> i64 {
        self.running.load(Ordering::Relaxed)
    }

    /// 1 while the instance is running, 0 otherwise.
    pub fn up_flag(&self) -> u64 {
        u64::from(self.up.load(Ordering::Relaxed))
    }

    /// Milliseconds since the instance came up; 0 whenever it is not up.
    pub fn uptime_ms(&self) -> u64 {
        let started_at = self.started_at.lock().expect("metrics lock poisoned");
        match *started_at {
            Some(t) if self.up.load(Ordering::Relaxed) => t.elapsed().as_millis() as u64,
            _ => 0,
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    pub(crate) fn on_launch(&self) {
        self.launched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_run_start(&self) {
        self.running.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_run_complete(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        // Clamped at zero: a run completing after the instance stopped (and
        // the gauge was reset) must not drive the gauge negative.
        let _ = self
            .running
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some((v - 1).max(0))
            });
    }

    /// Post-commit resolution: exactly one of committed/failed per run.
    pub(crate) fn on_commit(&self, successful: bool) {
        if successful {
            self.committed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn mark_up(&self) {
        let mut started_at = self.started_at.lock().expect("metrics lock poisoned");
        *started_at = Some(Instant::now());
        self.up.store(true, Ordering::Relaxed);
    }

    /// Reset gauges to baseline. Counters are monotonic and keep their values.
    pub(crate) fn mark_down(&self) {
        self.up.store(false, Ordering::Relaxed);
        let mut started_at = self.started_at.lock().expect("metrics lock poisoned");
        *started_at = None;
        self.running.store(0, Ordering::Relaxed);
    }
}
