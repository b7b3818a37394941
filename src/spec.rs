use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Config key holding the shell command the default executor runs.
/// A spec without it is a no-op job that succeeds immediately.
pub const CONFIG_COMMAND: &str = "job.command";

/// Config key holding the recurring-schedule interval in seconds.
/// Specs submitted through the catalog with this key set (and > 0) are
/// rescheduled on that interval; all other specs run once.
pub const CONFIG_INTERVAL_SECS: &str = "job.schedule.interval_secs";

/// Immutable description of a unit of work, identified by URI.
///
/// A spec is never mutated after construction; updating a job means putting
/// a new `JobSpec` with the same URI (and typically a new version) into the
/// catalog. Equality and hashing are by URI only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    uri: String,
    version: String,
    config: Map<String, Value>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl JobSpec {
    pub fn builder(uri: impl Into<String>) -> JobSpecBuilder {
        JobSpecBuilder {
            uri: uri.into(),
            version: "1".to_string(),
            config: Map::new(),
            description: None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Opaque configuration settings; parsing and format are owned by the
    /// spec's producer.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// String config value for `key`, if present and a string.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Unsigned integer config value for `key`, if present and numeric.
    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(Value::as_u64)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for JobSpec {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for JobSpec {}

impl Hash for JobSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

/// Builder for [`JobSpec`]. Obtained via [`JobSpec::builder`].
#[derive(Debug, Clone)]
pub struct JobSpecBuilder {
    uri: String,
    version: String,
    config: Map<String, Value>,
    description: Option<String>,
}

impl JobSpecBuilder {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replace the whole config map.
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Set a single config value.
    pub fn with_config_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> JobSpec {
        JobSpec {
            uri: self.uri,
            version: self.version,
            config: self.config,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

/// Predicate restricting which job specs an observer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSpecFilter {
    /// Matches every spec.
    AcceptAll,
    /// Matches specs with exactly this URI.
    EqUri(String),
    /// Matches specs with exactly this URI and version.
    EqUriVersion { uri: String, version: String },
}

impl JobSpecFilter {
    pub fn accept_all() -> Self {
        Self::AcceptAll
    }

    pub fn eq_job_spec_uri(uri: impl Into<String>) -> Self {
        Self::EqUri(uri.into())
    }

    pub fn eq_job_spec_uri_version(uri: impl Into<String>, version: impl Into<String>) -> Self {
        Self::EqUriVersion {
            uri: uri.into(),
            version: version.into(),
        }
    }

    pub fn accepts(&self, spec: &JobSpec) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::EqUri(uri) => spec.uri() == uri,
            Self::EqUriVersion { uri, version } => {
                spec.uri() == uri && spec.version() == version
            }
        }
    }

    /// URI-only match, for events that carry no full spec (e.g. removals).
    pub fn accepts_uri(&self, uri: &str) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::EqUri(u) | Self::EqUriVersion { uri: u, .. } => u == uri,
        }
    }
}
