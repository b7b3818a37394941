//! Shared helpers for overseer integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use overseer::execution::{
    ExecutionOutcome, JobExecutionDriver, JobExecutionResult, JobExecutor,
};
use overseer::instance::StandardInstanceLauncher;
use overseer::listener::JobLifecycleListener;
use overseer::spec::JobSpec;

/// Config key the [`TestExecutor`] reads to delay a run.
pub const TEST_DELAY_MS: &str = "test.delay_ms";

/// Config key the [`TestExecutor`] reads to force a failed run.
pub const TEST_RESULT: &str = "test.result";

/// Build an instance launcher around the [`TestExecutor`]. Not started.
pub fn test_instance(name: &str) -> StandardInstanceLauncher {
    StandardInstanceLauncher::builder()
        .with_instance_name(name)
        .with_executor(Arc::new(TestExecutor))
        .build()
}

/// Build and start an instance, waiting until it accepts submissions.
pub async fn running_instance(name: &str) -> StandardInstanceLauncher {
    let launcher = test_instance(name);
    launcher.start_async().expect("start_async failed");
    launcher
        .await_running(Duration::from_secs(1))
        .await
        .expect("instance did not reach running");
    launcher
}

/// A bare spec: no command, so a run is an immediate no-op success.
pub fn test_spec(uri: &str) -> JobSpec {
    JobSpec::builder(uri).with_version("1").build()
}

/// A spec whose run fails.
pub fn failing_spec(uri: &str) -> JobSpec {
    JobSpec::builder(uri)
        .with_version("1")
        .with_config_value(TEST_RESULT, "fail")
        .build()
}

/// A spec whose run sleeps for `delay_ms` before succeeding.
pub fn slow_spec(uri: &str, delay_ms: u64) -> JobSpec {
    JobSpec::builder(uri)
        .with_version("1")
        .with_config_value(TEST_DELAY_MS, delay_ms)
        .build()
}

/// In-process executor driven by spec config, so tests control run
/// duration and outcome without shelling out.
pub struct TestExecutor;

#[async_trait]
impl JobExecutor for TestExecutor {
    async fn execute(&self, spec: &JobSpec) -> ExecutionOutcome {
        if let Some(ms) = spec.config_u64(TEST_DELAY_MS) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if spec.config_str(TEST_RESULT) == Some("fail") {
            ExecutionOutcome::failure("configured failure")
        } else {
            ExecutionOutcome::success()
        }
    }
}

/// Executor that panics, for payload-isolation tests.
pub struct PanickingExecutor;

#[async_trait]
impl JobExecutor for PanickingExecutor {
    async fn execute(&self, _spec: &JobSpec) -> ExecutionOutcome {
        panic!("executor blew up");
    }
}

/// Listener that forwards every launched driver to a channel, so tests can
/// await the driver the way an embedding process would.
pub struct QueueingListener {
    tx: mpsc::UnboundedSender<JobExecutionDriver>,
}

impl QueueingListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<JobExecutionDriver>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl JobLifecycleListener for QueueingListener {
    fn on_job_launch(&self, driver: &JobExecutionDriver) {
        let _ = self.tx.send(driver.clone());
    }
}

/// Listener that records launch/completion events for later assertions.
#[derive(Default)]
pub struct RecordingListener {
    pub launches: Mutex<Vec<(String, String)>>,
    pub completions: Mutex<Vec<(String, JobExecutionResult)>>,
    pub scheduled: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn launched_uris(&self) -> Vec<String> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|(uri, _)| uri.clone())
            .collect()
    }
}

impl JobLifecycleListener for RecordingListener {
    fn on_job_launch(&self, driver: &JobExecutionDriver) {
        self.launches.lock().unwrap().push((
            driver.job_spec().uri().to_string(),
            driver.job_spec().version().to_string(),
        ));
    }

    fn on_job_completion(&self, driver: &JobExecutionDriver, result: &JobExecutionResult) {
        self.completions
            .lock()
            .unwrap()
            .push((driver.job_spec().uri().to_string(), result.clone()));
    }

    fn on_spec_scheduled(&self, spec: &JobSpec) {
        self.scheduled.lock().unwrap().push(spec.uri().to_string());
    }

    fn on_spec_cancelled(&self, uri: &str) {
        self.cancelled.lock().unwrap().push(uri.to_string());
    }
}

/// Wait for a condition to become true with timeout
pub async fn wait_for<F, Fut>(
    condition: F,
    timeout_duration: Duration,
    poll_interval: Duration,
) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout_duration {
        if condition().await {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    false
}

/// Assert a condition eventually becomes true. Metrics trail result
/// availability, so commit-counter assertions must go through this.
pub async fn assert_eventually<F, Fut>(condition: F, timeout_duration: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = wait_for(condition, timeout_duration, Duration::from_millis(20)).await;
    assert!(result, "{}", message);
}
