use std::path::PathBuf;

/// Configuration for the default command executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Shell used to run `job.command` values (invoked as `<shell> -c <cmd>`).
    pub shell: String,
    /// Working directory for job commands. Inherited from the process if unset.
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
        }
    }
}

/// Configuration for the job scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of scheduled runnables executing concurrently.
    /// Admissions beyond this wait for a slot; they are not rejected.
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Configuration for the in-memory job catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Maximum number of specs the catalog holds.
    pub max_specs: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { max_specs: 10_000 }
    }
}

/// Top-level configuration for one overseer instance.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Human-readable instance name, used in logs.
    pub name: String,
    pub executor: ExecutorConfig,
    pub scheduler: SchedulerConfig,
    pub catalog: CatalogConfig,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: "overseer".to_string(),
            executor: ExecutorConfig::default(),
            scheduler: SchedulerConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }
}
