use std::sync::Arc;

use crate::error::Result;
use crate::execution::{JobExecutionDriver, JobExecutionLauncher};
use crate::spec::JobSpec;

/// Schedulable unit bound to one job spec.
///
/// Running it launches the spec through the instance's execution launcher
/// and starts the returned driver, so every scheduled execution goes
/// through the same launch/notify path as a direct launch. Created via the
/// instance driver's `create_job_runnable`.
pub struct JobRunnable {
    spec: JobSpec,
    launcher: Arc<JobExecutionLauncher>,
}

impl JobRunnable {
    pub(crate) fn new(spec: JobSpec, launcher: Arc<JobExecutionLauncher>) -> Self {
        Self { spec, launcher }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// Launch and start one run of the bound spec.
    pub async fn run(&self) -> Result<JobExecutionDriver> {
        let driver = self.launcher.launch_job(self.spec.clone())?;
        driver.start_async()?;
        Ok(driver)
    }
}
