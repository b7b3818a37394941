use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ExecutorConfig;
use crate::spec::{JobSpec, CONFIG_COMMAND};

/// Terminal status of one executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "succeeded"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Raw outcome reported by a [`JobExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn success() -> Self {
        Self {
            status: ExecutionStatus::Succeeded,
            exit_code: Some(0),
            output: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            exit_code: None,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Executable unit a job spec hands off to.
///
/// The shape of the payload (process, function, remote call) is pluggable;
/// implementations derive what to run from the spec's configuration and
/// report back the outcome. Payload failures are data, never panics.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, spec: &JobSpec) -> ExecutionOutcome;
}

/// Default executor: runs the spec's `job.command` via the configured shell
/// and captures output.
///
/// A spec without `job.command` is treated as a no-op job that succeeds
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    fn process_output(
        spec: &JobSpec,
        result: Result<std::process::Output, std::io::Error>,
    ) -> ExecutionOutcome {
        match result {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code();

                let (status, error) = if output.status.success() {
                    (ExecutionStatus::Succeeded, None)
                } else {
                    (
                        ExecutionStatus::Failed,
                        Some(if stderr.is_empty() {
                            format!("Exit code: {:?}", exit_code)
                        } else {
                            stderr.clone()
                        }),
                    )
                };

                tracing::info!(
                    uri = %spec.uri(),
                    status = %status,
                    exit_code = ?exit_code,
                    "Job command finished"
                );

                ExecutionOutcome {
                    status,
                    exit_code,
                    output: if stdout.is_empty() {
                        None
                    } else {
                        Some(stdout)
                    },
                    error,
                }
            }
            Err(e) => {
                tracing::error!(uri = %spec.uri(), error = %e, "Job command failed to spawn");
                ExecutionOutcome::failure(e.to_string())
            }
        }
    }
}

#[async_trait]
impl JobExecutor for CommandExecutor {
    async fn execute(&self, spec: &JobSpec) -> ExecutionOutcome {
        let Some(command) = spec.config_str(CONFIG_COMMAND) else {
            tracing::debug!(uri = %spec.uri(), "No job command configured, run is a no-op");
            return ExecutionOutcome::success();
        };

        tracing::info!(uri = %spec.uri(), command, shell = %self.config.shell, "Executing job command");

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let result = cmd.output().await;
        Self::process_output(spec, result)
    }
}
