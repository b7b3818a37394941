use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverseerError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { waited: Duration, what: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("job catalog is at capacity ({capacity} specs)")]
    CatalogFull { capacity: usize },

    #[error("job spec not found: {0}")]
    SpecNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OverseerError {
    /// Build a timeout error for a bounded wait that elapsed.
    pub fn timeout(waited: Duration, what: impl Into<String>) -> Self {
        Self::Timeout {
            waited,
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OverseerError>;
