use std::collections::HashMap;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use uuid::Uuid;

/// One admitted schedule entry, keyed by spec URI in the table.
pub(crate) struct Entry {
    pub id: Uuid,
    pub recurring: bool,
    pub handle: Option<JoinHandle<()>>,
}

/// Bookkeeping for admitted-but-not-started (and recurring) schedule
/// entries, keyed by spec URI.
///
/// The entry id is the tie-breaker between a replacement and the task it
/// replaces: a task only executes if its id is still the current one for
/// its URI at claim time, so a replaced entry never runs even if its abort
/// lands late.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<String, Entry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry for `uri`, replacing any existing one.
    /// Returns the replaced entry's handle so the caller can abort it.
    pub fn begin(&self, uri: &str, id: Uuid, recurring: bool) -> Option<JoinHandle<()>> {
        let mut entries = self.entries.lock().expect("pending lock poisoned");
        let prior = entries.insert(
            uri.to_string(),
            Entry {
                id,
                recurring,
                handle: None,
            },
        );
        prior.and_then(|e| e.handle)
    }

    /// Attach the spawned task's handle to its entry.
    /// Gives the handle back if the entry was already replaced, so the
    /// caller can abort the now-stale task.
    pub fn attach(&self, uri: &str, id: Uuid, handle: JoinHandle<()>) -> Option<JoinHandle<()>> {
        let mut entries = self.entries.lock().expect("pending lock poisoned");
        match entries.get_mut(uri) {
            Some(entry) if entry.id == id => {
                entry.handle = Some(handle);
                None
            }
            _ => Some(handle),
        }
    }

    /// One-shot execution claim: removes the entry if `id` is still current.
    /// A claimed entry is no longer pending and can no longer be cancelled.
    pub fn claim(&self, uri: &str, id: Uuid) -> bool {
        let mut entries = self.entries.lock().expect("pending lock poisoned");
        match entries.get(uri) {
            Some(entry) if entry.id == id && !entry.recurring => {
                entries.remove(uri);
                true
            }
            _ => false,
        }
    }

    /// Whether `id` is still the live entry for `uri`. Recurring loops check
    /// this each tick and exit once replaced or cancelled.
    pub fn is_current(&self, uri: &str, id: Uuid) -> bool {
        let entries = self.entries.lock().expect("pending lock poisoned");
        entries.get(uri).is_some_and(|e| e.id == id)
    }

    /// Remove the entry for `uri`, if any.
    pub fn remove(&self, uri: &str) -> Option<Entry> {
        let mut entries = self.entries.lock().expect("pending lock poisoned");
        entries.remove(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        let entries = self.entries.lock().expect("pending lock poisoned");
        entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("pending lock poisoned").len()
    }
}
