//! Job lifecycle observation.
//!
//! Listeners are registered with the instance as *weak* references:
//! registration does not extend a listener's lifetime, and a listener that
//! becomes otherwise unreachable silently stops receiving events. Dispatch
//! order across listeners is unspecified; delivery to each live, matching
//! listener is exactly once per event.

use std::sync::{Arc, Mutex, Weak};

use crate::execution::{JobExecutionDriver, JobExecutionResult};
use crate::spec::{JobSpec, JobSpecFilter};

/// Observer of job lifecycle events.
///
/// Callbacks run on the dispatching task and must not block indefinitely;
/// slow listeners are the listener's own concern.
pub trait JobLifecycleListener: Send + Sync {
    /// A driver was created for a spec. Fired exactly once per launch,
    /// before the run starts; the driver is still in the created state.
    fn on_job_launch(&self, driver: &JobExecutionDriver);

    /// A run reached a terminal state, successful or failed.
    fn on_job_completion(&self, driver: &JobExecutionDriver, result: &JobExecutionResult) {
        let _ = (driver, result);
    }

    /// A spec was admitted to the scheduler.
    fn on_spec_scheduled(&self, spec: &JobSpec) {
        let _ = spec;
    }

    /// A spec's pending or recurring schedule was cancelled.
    fn on_spec_cancelled(&self, uri: &str) {
        let _ = uri;
    }
}

/// Listener that logs every event.
#[derive(Debug, Default)]
pub struct LoggingJobLifecycleListener;

impl JobLifecycleListener for LoggingJobLifecycleListener {
    fn on_job_launch(&self, driver: &JobExecutionDriver) {
        tracing::info!(uri = %driver.job_spec().uri(), run_id = %driver.run_id(), "Job launched");
    }

    fn on_job_completion(&self, driver: &JobExecutionDriver, result: &JobExecutionResult) {
        tracing::info!(
            uri = %driver.job_spec().uri(),
            run_id = %driver.run_id(),
            successful = result.is_successful(),
            "Job completed"
        );
    }

    fn on_spec_scheduled(&self, spec: &JobSpec) {
        tracing::info!(uri = %spec.uri(), "Spec scheduled");
    }

    fn on_spec_cancelled(&self, uri: &str) {
        tracing::info!(uri, "Spec schedule cancelled");
    }
}

/// Decorator forwarding events to a delegate only when the filter accepts
/// the event's spec.
pub struct FilteredJobLifecycleListener {
    filter: JobSpecFilter,
    delegate: Arc<dyn JobLifecycleListener>,
}

impl FilteredJobLifecycleListener {
    pub fn new(filter: JobSpecFilter, delegate: Arc<dyn JobLifecycleListener>) -> Self {
        Self { filter, delegate }
    }
}

impl JobLifecycleListener for FilteredJobLifecycleListener {
    fn on_job_launch(&self, driver: &JobExecutionDriver) {
        if self.filter.accepts(driver.job_spec()) {
            self.delegate.on_job_launch(driver);
        }
    }

    fn on_job_completion(&self, driver: &JobExecutionDriver, result: &JobExecutionResult) {
        if self.filter.accepts(driver.job_spec()) {
            self.delegate.on_job_completion(driver, result);
        }
    }

    fn on_spec_scheduled(&self, spec: &JobSpec) {
        if self.filter.accepts(spec) {
            self.delegate.on_spec_scheduled(spec);
        }
    }

    fn on_spec_cancelled(&self, uri: &str) {
        if self.filter.accepts_uri(uri) {
            self.delegate.on_spec_cancelled(uri);
        }
    }
}

/// Registry of weakly-held listeners.
///
/// Dead entries are pruned on every dispatch; a listener dropped between
/// registration and an event is skipped silently.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Weak<dyn JobLifecycleListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener without taking ownership of its lifetime.
    pub fn register(&self, listener: &Arc<dyn JobLifecycleListener>) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.push(Arc::downgrade(listener));
    }

    /// Number of currently-live registrations.
    pub fn live_count(&self) -> usize {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Invoke `event` on every still-reachable listener.
    ///
    /// Upgrades happen under the lock, callbacks outside it, so a callback
    /// may register further listeners without deadlocking.
    pub(crate) fn dispatch(&self, event: impl Fn(&dyn JobLifecycleListener)) {
        let live: Vec<Arc<dyn JobLifecycleListener>> = {
            let mut listeners = self.listeners.lock().expect("listener lock poisoned");
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            event(&*listener);
        }
    }
}
