use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogEvent, JobCatalog};
use crate::config::InstanceConfig;
use crate::execution::{JobExecutionLauncher, JobExecutor};
use crate::listener::{JobLifecycleListener, ListenerRegistry};
use crate::metrics::ExecutionMetrics;
use crate::scheduler::{JobRunnable, JobScheduler};
use crate::spec::{JobSpec, CONFIG_INTERVAL_SECS};

/// Composes catalog, scheduler, launcher, metrics, and the listener
/// registry into one running instance.
///
/// The driver owns the wiring between submission paths: catalog mutations
/// are observed on a background loop and forwarded to the scheduler, which
/// in turn invokes the launcher through a [`JobRunnable`]. Callers that
/// want to schedule without going through the catalog get their runnable
/// from [`create_job_runnable`](Self::create_job_runnable).
pub struct InstanceDriver {
    name: String,
    catalog: Arc<JobCatalog>,
    scheduler: Arc<JobScheduler>,
    launcher: Arc<JobExecutionLauncher>,
    metrics: Arc<ExecutionMetrics>,
    listeners: Arc<ListenerRegistry>,
    shutdown: CancellationToken,
}

impl InstanceDriver {
    pub(crate) fn new(
        config: &InstanceConfig,
        executor: Arc<dyn JobExecutor>,
        shutdown: CancellationToken,
    ) -> Self {
        let metrics = Arc::new(ExecutionMetrics::new());
        let listeners = Arc::new(ListenerRegistry::new());
        let launcher = Arc::new(JobExecutionLauncher::new(
            executor,
            metrics.clone(),
            listeners.clone(),
        ));
        let scheduler = Arc::new(JobScheduler::new(
            &config.scheduler,
            listeners.clone(),
            shutdown.clone(),
        ));
        let catalog = Arc::new(JobCatalog::new(config.catalog.clone()));

        Self {
            name: config.name.clone(),
            catalog,
            scheduler,
            launcher,
            metrics,
            listeners,
            shutdown,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.name
    }

    /// The mutable job catalog; `put` is a submission path.
    pub fn job_catalog(&self) -> Arc<JobCatalog> {
        self.catalog.clone()
    }

    pub fn job_scheduler(&self) -> Arc<JobScheduler> {
        self.scheduler.clone()
    }

    pub fn job_launcher(&self) -> Arc<JobExecutionLauncher> {
        self.launcher.clone()
    }

    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        self.metrics.clone()
    }

    /// Register a lifecycle listener without extending its lifetime.
    /// A listener dropped elsewhere stops receiving events; no explicit
    /// deregistration exists or is needed.
    pub fn register_weak_job_lifecycle_listener(&self, listener: &Arc<dyn JobLifecycleListener>) {
        self.listeners.register(listener);
    }

    /// Build the schedulable unit for `spec`, for callers that want to hand
    /// it to the scheduler directly instead of going through the catalog.
    pub fn create_job_runnable(&self, spec: JobSpec) -> JobRunnable {
        JobRunnable::new(spec, self.launcher.clone())
    }

    /// Spawn the loop forwarding catalog mutations to the scheduler.
    ///
    /// The subscription is taken before spawning, so every mutation after
    /// this call is observed even if the loop task is not yet polled. The
    /// loop drains when the instance shutdown token fires.
    pub(crate) fn spawn_catalog_loop(self: Arc<Self>) -> JoinHandle<()> {
        let events = self.catalog.subscribe();
        tokio::spawn(async move {
            self.catalog_loop(events).await;
        })
    }

    async fn catalog_loop(&self, mut events: broadcast::Receiver<CatalogEvent>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(CatalogEvent::Put(spec)) => self.schedule_from_catalog(spec),
                    Ok(CatalogEvent::Removed(uri)) => {
                        self.scheduler.cancel(&uri);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(instance = %self.name, missed, "Catalog event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        tracing::debug!(instance = %self.name, "Catalog loop drained");
    }

    fn schedule_from_catalog(&self, spec: JobSpec) {
        let runnable = self.create_job_runnable(spec.clone());
        let result = match spec.config_u64(CONFIG_INTERVAL_SECS) {
            Some(secs) if secs > 0 => {
                self.scheduler
                    .schedule_recurring(&spec, Duration::from_secs(secs), runnable)
            }
            _ => self.scheduler.schedule_once(&spec, runnable),
        };
        if let Err(e) = result {
            tracing::error!(uri = %spec.uri(), error = %e, "Failed to schedule catalog spec");
        }
    }
}
