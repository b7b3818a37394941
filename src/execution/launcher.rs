use std::sync::Arc;

use crate::error::{OverseerError, Result};
use crate::execution::driver::JobExecutionDriver;
use crate::execution::executor::JobExecutor;
use crate::listener::ListenerRegistry;
use crate::metrics::ExecutionMetrics;
use crate::spec::JobSpec;

/// Turns a job spec into a running execution driver.
///
/// Owns the per-instance [`ExecutionMetrics`] and fans launch events out to
/// the instance's listener registry. Every submission path (direct launch,
/// scheduler, catalog) funnels through [`launch_job`](Self::launch_job), so
/// the launch notification fires exactly once per run regardless of path.
pub struct JobExecutionLauncher {
    executor: Arc<dyn JobExecutor>,
    metrics: Arc<ExecutionMetrics>,
    listeners: Arc<ListenerRegistry>,
}

impl JobExecutionLauncher {
    pub(crate) fn new(
        executor: Arc<dyn JobExecutor>,
        metrics: Arc<ExecutionMetrics>,
        listeners: Arc<ListenerRegistry>,
    ) -> Self {
        Self {
            executor,
            metrics,
            listeners,
        }
    }

    /// Create a driver for `spec` in the created state.
    ///
    /// The run does not start until the caller invokes the driver's
    /// `start_async`, so observers can be attached first. Fails with
    /// [`OverseerError::InvalidState`] while the instance is not accepting
    /// submissions (not yet running, stopping, or stopped).
    pub fn launch_job(&self, spec: JobSpec) -> Result<JobExecutionDriver> {
        if !self.metrics.is_up() {
            return Err(OverseerError::InvalidState(format!(
                "instance is not accepting job submissions (spec {})",
                spec.uri()
            )));
        }

        let driver = JobExecutionDriver::new(
            spec,
            self.executor.clone(),
            self.metrics.clone(),
            self.listeners.clone(),
        );
        tracing::info!(
            uri = %driver.job_spec().uri(),
            run_id = %driver.run_id(),
            "Job launched"
        );
        self.listeners.dispatch(|l| l.on_job_launch(&driver));
        Ok(driver)
    }

    /// The shared per-instance metrics, valid for the launcher's lifetime.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        self.metrics.clone()
    }
}
