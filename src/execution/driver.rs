use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{OverseerError, Result};
use crate::execution::executor::{ExecutionOutcome, ExecutionStatus, JobExecutor};
use crate::listener::ListenerRegistry;
use crate::metrics::ExecutionMetrics;
use crate::spec::JobSpec;

/// Outcome of one run. Produced exactly once, at completion; every observer
/// of the same run sees the same result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionResult {
    successful: bool,
    error: Option<String>,
    exit_code: Option<i32>,
    output: Option<String>,
    completed_at: DateTime<Utc>,
}

impl JobExecutionResult {
    fn from_outcome(outcome: ExecutionOutcome) -> Self {
        Self {
            successful: outcome.status == ExecutionStatus::Succeeded,
            error: outcome.error,
            exit_code: outcome.exit_code,
            output: outcome.output,
            completed_at: Utc::now(),
        }
    }

    /// Whether the run reached the succeeded state.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// Lifecycle state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverState::Created => write!(f, "created"),
            DriverState::Running => write!(f, "running"),
            DriverState::Succeeded => write!(f, "succeeded"),
            DriverState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone)]
enum RunPhase {
    Created,
    Running,
    Done(JobExecutionResult),
}

/// Drives a single asynchronous run of one job spec to a result.
///
/// Construction and start are separate: the launcher returns the driver in
/// the created state so callers can attach observers before execution
/// begins, then [`start_async`](Self::start_async) transitions it to running
/// exactly once. The handle is cheap to clone; all clones observe the same
/// run.
#[derive(Clone)]
pub struct JobExecutionDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    spec: JobSpec,
    run_id: Uuid,
    started: AtomicBool,
    phase: watch::Sender<RunPhase>,
    executor: Arc<dyn JobExecutor>,
    metrics: Arc<ExecutionMetrics>,
    listeners: Arc<ListenerRegistry>,
}

impl JobExecutionDriver {
    pub(crate) fn new(
        spec: JobSpec,
        executor: Arc<dyn JobExecutor>,
        metrics: Arc<ExecutionMetrics>,
        listeners: Arc<ListenerRegistry>,
    ) -> Self {
        let (phase, _) = watch::channel(RunPhase::Created);
        Self {
            inner: Arc::new(DriverInner {
                spec,
                run_id: Uuid::new_v4(),
                started: AtomicBool::new(false),
                phase,
                executor,
                metrics,
                listeners,
            }),
        }
    }

    pub fn job_spec(&self) -> &JobSpec {
        &self.inner.spec
    }

    /// Unique id of this run (distinct across launches of the same spec).
    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn state(&self) -> DriverState {
        match &*self.inner.phase.borrow() {
            RunPhase::Created => DriverState::Created,
            RunPhase::Running => DriverState::Running,
            RunPhase::Done(result) if result.is_successful() => DriverState::Succeeded,
            RunPhase::Done(_) => DriverState::Failed,
        }
    }

    /// Transition created -> running and hand off to the executor.
    ///
    /// Returns immediately; the run proceeds on a spawned task. Calling this
    /// a second time is a usage error.
    pub fn start_async(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(OverseerError::InvalidState(format!(
                "job execution driver for {} already started",
                self.inner.spec.uri()
            )));
        }

        self.inner.phase.send_replace(RunPhase::Running);
        self.inner.metrics.on_launch();
        self.inner.metrics.on_run_start();
        tracing::debug!(uri = %self.inner.spec.uri(), run_id = %self.inner.run_id, "Job run starting");

        let driver = self.clone();
        tokio::spawn(async move {
            driver.run().await;
        });
        Ok(())
    }

    async fn run(self) {
        let executor = self.inner.executor.clone();
        let spec = self.inner.spec.clone();

        // The payload runs on its own task so a panicking executor becomes a
        // failed result instead of tearing down run tracking.
        let outcome = match tokio::spawn(async move { executor.execute(&spec).await }).await {
            Ok(outcome) => outcome,
            Err(e) => ExecutionOutcome::failure(format!("job payload panicked: {e}")),
        };

        let result = JobExecutionResult::from_outcome(outcome);
        tracing::info!(
            uri = %self.inner.spec.uri(),
            run_id = %self.inner.run_id,
            successful = result.is_successful(),
            "Job run finished"
        );

        // Completion counters land before the result is observable, the
        // commit resolution after, on its own task. Readers polling the
        // commit counters right after a result must use bounded backoff.
        self.inner.metrics.on_run_complete();
        self.inner.phase.send_replace(RunPhase::Done(result.clone()));

        self.inner
            .listeners
            .dispatch(|l| l.on_job_completion(&self, &result));

        let metrics = self.inner.metrics.clone();
        let successful = result.is_successful();
        tokio::spawn(async move {
            metrics.on_commit(successful);
        });
    }

    /// Unbounded wait until the run is terminal. Scheduler-internal; the
    /// public surface only offers the bounded [`await_result`](Self::await_result).
    pub(crate) async fn await_terminal(&self) {
        let mut rx = self.inner.phase.subscribe();
        loop {
            {
                if matches!(&*rx.borrow_and_update(), RunPhase::Done(_)) {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Bounded wait for the run's terminal result.
    ///
    /// Elapsing the timeout fails with [`OverseerError::Timeout`] without
    /// altering the run's state. Once the run is terminal, every call
    /// (including late callers) returns the same result.
    pub async fn await_result(&self, timeout: Duration) -> Result<JobExecutionResult> {
        let mut rx = self.inner.phase.subscribe();
        let wait = async {
            loop {
                {
                    let phase = rx.borrow_and_update();
                    if let RunPhase::Done(result) = &*phase {
                        return Ok(result.clone());
                    }
                }
                if rx.changed().await.is_err() {
                    return Err(OverseerError::Internal(format!(
                        "run of {} ended without publishing a result",
                        self.inner.spec.uri()
                    )));
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(OverseerError::timeout(
                timeout,
                format!("result of job {}", self.inner.spec.uri()),
            )),
        }
    }
}
