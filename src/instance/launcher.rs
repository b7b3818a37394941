use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::InstanceConfig;
use crate::error::Result;
use crate::execution::{CommandExecutor, JobExecutor};
use crate::instance::driver::InstanceDriver;
use crate::instance::state::{InstanceState, StateCell};

/// Owns the start/stop lifecycle of one instance as an asynchronous
/// service.
///
/// Built via [`builder`](Self::builder); construction does not start the
/// instance. `start_async`/`stop_async` return immediately; callers use
/// `await_running`/`await_terminated` for bounded waits on the
/// corresponding state.
pub struct StandardInstanceLauncher {
    driver: Arc<InstanceDriver>,
    state: Arc<StateCell>,
    shutdown: CancellationToken,
}

impl StandardInstanceLauncher {
    pub fn builder() -> InstanceLauncherBuilder {
        InstanceLauncherBuilder::default()
    }

    /// The composed instance driver. Valid before start, but submissions
    /// are only accepted while the instance is running.
    pub fn driver(&self) -> Arc<InstanceDriver> {
        self.driver.clone()
    }

    pub fn state(&self) -> InstanceState {
        self.state.current()
    }

    /// Begin starting the instance. Returns once the transition to
    /// starting is booked; use [`await_running`](Self::await_running) to
    /// wait for submissions to unblock.
    pub fn start_async(&self) -> Result<()> {
        self.state.transition(InstanceState::Starting)?;
        tracing::info!(instance = %self.driver.instance_name(), "Instance starting");

        let driver = self.driver.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            driver.clone().spawn_catalog_loop();
            driver.metrics().mark_up();
            if let Err(e) = state.transition(InstanceState::Running) {
                tracing::error!(error = %e, "Instance failed to reach running");
                driver.metrics().mark_down();
                state.fail();
            }
        });
        Ok(())
    }

    /// Begin stopping the instance. New submissions are disabled and the
    /// up/uptime/running gauges return to baseline; already-started runs
    /// are not cancelled.
    pub fn stop_async(&self) -> Result<()> {
        self.state.transition(InstanceState::Stopping)?;
        tracing::info!(instance = %self.driver.instance_name(), "Instance stopping");
        self.shutdown.cancel();

        let driver = self.driver.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            driver.metrics().mark_down();
            if let Err(e) = state.transition(InstanceState::Terminated) {
                tracing::error!(error = %e, "Instance failed to terminate cleanly");
                state.fail();
            }
        });
        Ok(())
    }

    /// Bounded wait until the instance is running.
    pub async fn await_running(&self, timeout: Duration) -> Result<()> {
        self.state
            .await_state(InstanceState::Running, timeout, "instance running")
            .await
    }

    /// Bounded wait until the instance has terminated.
    pub async fn await_terminated(&self, timeout: Duration) -> Result<()> {
        self.state
            .await_state(InstanceState::Terminated, timeout, "instance terminated")
            .await
    }
}

/// Builder for [`StandardInstanceLauncher`].
#[derive(Default)]
pub struct InstanceLauncherBuilder {
    config: InstanceConfig,
    executor: Option<Arc<dyn JobExecutor>>,
}

impl InstanceLauncherBuilder {
    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_config(mut self, config: InstanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default command executor with a custom payload seam.
    pub fn with_executor(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> StandardInstanceLauncher {
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(CommandExecutor::new(self.config.executor.clone())));
        let shutdown = CancellationToken::new();
        let driver = Arc::new(InstanceDriver::new(&self.config, executor, shutdown.clone()));
        StandardInstanceLauncher {
            driver,
            state: Arc::new(StateCell::new()),
            shutdown,
        }
    }
}
