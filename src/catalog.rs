//! Mutable registry of current job specs.
//!
//! Mutation is itself a submission path: every `put` emits exactly one
//! [`CatalogEvent::Put`] that the instance forwards to the scheduler, and
//! every `remove` emits a [`CatalogEvent::Removed`] that cancels any pending
//! or recurring schedule for that URI. Events are fanned out on a
//! `tokio::sync::broadcast` channel; with no subscribers they are dropped.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::config::CatalogConfig;
use crate::error::{OverseerError, Result};
use crate::spec::JobSpec;

/// Buffer capacity for the catalog event channel. Slow subscribers observe
/// `RecvError::Lagged` when they fall further behind than this.
const EVENT_CAPACITY: usize = 1024;

/// A catalog mutation, as observed by subscribers.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// A spec was inserted or replaced.
    Put(JobSpec),
    /// The spec with this URI was removed.
    Removed(String),
}

pub struct JobCatalog {
    specs: Mutex<HashMap<String, JobSpec>>,
    max_specs: usize,
    events: broadcast::Sender<CatalogEvent>,
}

impl JobCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            specs: Mutex::new(HashMap::new()),
            max_specs: config.max_specs,
            events,
        }
    }

    /// Insert or replace the entry keyed by the spec's URI.
    ///
    /// Emits exactly one `Put` event per call. Concurrent puts of the same
    /// URI resolve to last-writer-wins; events are emitted in the same order
    /// the writes land, so the final event always carries the final value.
    pub fn put(&self, spec: JobSpec) -> Result<()> {
        let mut specs = self.specs.lock().expect("catalog lock poisoned");
        if !specs.contains_key(spec.uri()) && specs.len() >= self.max_specs {
            return Err(OverseerError::CatalogFull {
                capacity: self.max_specs,
            });
        }
        let replaced = specs.insert(spec.uri().to_string(), spec.clone()).is_some();
        tracing::debug!(uri = %spec.uri(), version = %spec.version(), replaced, "Catalog put");
        // Event emitted under the map lock so event order matches write order.
        // Send never blocks; a send error only means there are no subscribers.
        let _ = self.events.send(CatalogEvent::Put(spec));
        Ok(())
    }

    /// Remove the entry for `uri`, returning the removed spec.
    pub fn remove(&self, uri: &str) -> Result<JobSpec> {
        let mut specs = self.specs.lock().expect("catalog lock poisoned");
        let removed = specs
            .remove(uri)
            .ok_or_else(|| OverseerError::SpecNotFound(uri.to_string()))?;
        tracing::debug!(uri, "Catalog remove");
        let _ = self.events.send(CatalogEvent::Removed(uri.to_string()));
        Ok(removed)
    }

    pub fn get(&self, uri: &str) -> Option<JobSpec> {
        self.specs
            .lock()
            .expect("catalog lock poisoned")
            .get(uri)
            .cloned()
    }

    /// All current specs, sorted chronologically by creation time.
    pub fn all_specs(&self) -> Vec<JobSpec> {
        let specs = self.specs.lock().expect("catalog lock poisoned");
        let mut all: Vec<JobSpec> = specs.values().cloned().collect();
        all.sort_by_key(|s| s.created_at());
        all
    }

    pub fn len(&self) -> usize {
        self.specs.lock().expect("catalog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_specs
    }

    /// Subscribe to all subsequent catalog mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }
}
