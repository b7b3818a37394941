//! Job scheduling: decides *when* a spec runs and admits it to the
//! execution resource.
//!
//! Admission never blocks the submitter: `schedule_once` and
//! `schedule_recurring` return as soon as the entry is booked; execution
//! happens on scheduler-owned tasks gated by a concurrency semaphore. A
//! permit is held from launch until the run is terminal, so at most
//! `max_concurrent` scheduler-admitted jobs run at once; entries beyond
//! that stay pending until a slot frees.
//!
//! # De-duplication policy
//!
//! Scheduling a URI that already has a pending (admitted, not yet started)
//! entry *replaces* that entry, so a rapid re-put of a spec runs the latest
//! version exactly once. An entry that has started executing is never
//! cancelled by a replacement. Catalog removal cancels pending and
//! recurring entries for the removed URI.

pub mod pending;
pub mod runnable;

pub use runnable::JobRunnable;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{OverseerError, Result};
use crate::listener::ListenerRegistry;
use crate::spec::JobSpec;

use pending::PendingTable;

pub struct JobScheduler {
    pending: Arc<PendingTable>,
    permits: Arc<Semaphore>,
    listeners: Arc<ListenerRegistry>,
    shutdown: CancellationToken,
}

impl JobScheduler {
    pub(crate) fn new(
        config: &SchedulerConfig,
        listeners: Arc<ListenerRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pending: Arc::new(PendingTable::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            listeners,
            shutdown,
        }
    }

    /// Execute `runnable` at most once, as soon as a concurrency slot is
    /// available. Returns without waiting for execution to start.
    ///
    /// A pending entry for the same URI is replaced (see module docs).
    pub fn schedule_once(&self, spec: &JobSpec, runnable: JobRunnable) -> Result<()> {
        self.ensure_accepting()?;

        let uri = spec.uri().to_string();
        let id = Uuid::new_v4();
        if let Some(prior) = self.pending.begin(&uri, id, false) {
            prior.abort();
            tracing::debug!(uri = %uri, "Replaced pending schedule entry");
        }

        let pending = self.pending.clone();
        let permits = self.permits.clone();
        let shutdown = self.shutdown.clone();
        let task_uri = uri.clone();
        let handle = tokio::spawn(async move {
            let _permit = tokio::select! {
                _ = shutdown.cancelled() => return,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            // Claim execution; a replaced entry exits without running.
            if !pending.claim(&task_uri, id) {
                return;
            }
            // An erroring runnable is isolated to its own job. The permit
            // is held until the run is terminal.
            match runnable.run().await {
                Ok(driver) => driver.await_terminal().await,
                Err(e) => {
                    tracing::error!(uri = %task_uri, error = %e, "Scheduled job failed to launch");
                }
            }
        });
        if let Some(stale) = self.pending.attach(&uri, id, handle) {
            stale.abort();
        }

        self.listeners.dispatch(|l| l.on_spec_scheduled(spec));
        tracing::debug!(uri = %spec.uri(), "Job admitted to scheduler");
        Ok(())
    }

    /// Execute `runnable` immediately and then on every `interval` tick
    /// until cancelled, replaced, or the instance shuts down.
    pub fn schedule_recurring(
        &self,
        spec: &JobSpec,
        interval: Duration,
        runnable: JobRunnable,
    ) -> Result<()> {
        self.ensure_accepting()?;

        let uri = spec.uri().to_string();
        let id = Uuid::new_v4();
        if let Some(prior) = self.pending.begin(&uri, id, true) {
            prior.abort();
            tracing::debug!(uri = %uri, "Replaced recurring schedule entry");
        }

        let pending = self.pending.clone();
        let permits = self.permits.clone();
        let shutdown = self.shutdown.clone();
        let task_uri = uri.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if !pending.is_current(&task_uri, id) {
                    break;
                }
                let _permit = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = permits.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                match runnable.run().await {
                    Ok(driver) => driver.await_terminal().await,
                    Err(e) => {
                        tracing::error!(uri = %task_uri, error = %e, "Recurring job failed to launch");
                    }
                }
            }
        });
        if let Some(stale) = self.pending.attach(&uri, id, handle) {
            stale.abort();
        }

        self.listeners.dispatch(|l| l.on_spec_scheduled(spec));
        tracing::debug!(uri = %spec.uri(), interval_secs = interval.as_secs(), "Recurring job admitted");
        Ok(())
    }

    /// Cancel the pending or recurring entry for `uri`, if one exists.
    /// Entries already claimed for execution are unaffected.
    pub fn cancel(&self, uri: &str) -> bool {
        match self.pending.remove(uri) {
            Some(entry) => {
                if let Some(handle) = entry.handle {
                    handle.abort();
                }
                tracing::debug!(uri, "Schedule cancelled");
                self.listeners.dispatch(|l| l.on_spec_cancelled(uri));
                true
            }
            None => false,
        }
    }

    /// Whether `uri` currently has a pending or recurring entry.
    pub fn has_entry(&self, uri: &str) -> bool {
        self.pending.contains(uri)
    }

    /// Number of pending and recurring entries.
    pub fn entry_count(&self) -> usize {
        self.pending.len()
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(OverseerError::InvalidState(
                "scheduler is shut down".to_string(),
            ));
        }
        Ok(())
    }
}
