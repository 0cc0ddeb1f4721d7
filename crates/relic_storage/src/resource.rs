//! Per-resource entity store: collection, index, and bookkeeping maps.

use std::collections::HashMap;
use std::fmt;

use relic_foundation::{ChangeEvent, Key, ObserverFn, ObserverId, Record, Value};

use crate::cache::Cache;

/// The mutable state one registered resource owns.
///
/// The cache is the index (key → record); `order` preserves insertion
/// order for the collection view. Every bookkeeping map is keyed by the
/// record key, and [`ResourceStore::purge`] removes a key from all of
/// them atomically with respect to any single store operation.
pub struct ResourceStore {
    pub(crate) cache: Cache,
    pub(crate) order: Vec<Key>,
    /// Key → stamp of the last modification.
    pub(crate) modified: HashMap<Key, u64>,
    /// Key → last-known-persisted snapshot, for diffing and revert.
    pub(crate) saved: HashMap<Key, Record>,
    /// Key → attribute values prior to the last inject.
    pub(crate) previous: HashMap<Key, Record>,
    /// Key → computed field → dependency values at the last evaluation.
    pub(crate) computed_state: HashMap<Key, HashMap<String, Vec<Value>>>,
    /// Canonical query signature → stamp when the query went in flight.
    pub(crate) pending_queries: HashMap<String, u64>,
    /// Canonical query signature → stamp when the query completed.
    pub(crate) completed_queries: HashMap<String, u64>,
    /// Key → registered change observers.
    pub(crate) observers: HashMap<Key, Vec<(ObserverId, ObserverFn)>>,
    /// Bumped on any structural change to the collection.
    pub(crate) collection_modified: u64,
    /// Monotonic per-resource operation stamp.
    stamp: u64,
}

impl ResourceStore {
    pub(crate) fn new(cache: Cache) -> Self {
        Self {
            cache,
            order: Vec::new(),
            modified: HashMap::new(),
            saved: HashMap::new(),
            previous: HashMap::new(),
            computed_state: HashMap::new(),
            pending_queries: HashMap::new(),
            completed_queries: HashMap::new(),
            observers: HashMap::new(),
            collection_modified: 0,
            stamp: 0,
        }
    }

    /// Advances and returns the operation stamp.
    pub(crate) fn tick(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    /// Stamps a key as modified.
    pub(crate) fn mark_modified(&mut self, key: &Key) {
        let stamp = self.tick();
        self.modified.insert(key.clone(), stamp);
    }

    /// Returns the number of records in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.order
    }

    /// Returns the stamp of the last structural change.
    #[must_use]
    pub fn collection_modified(&self) -> u64 {
        self.collection_modified
    }

    /// Returns the modification stamp for a key.
    #[must_use]
    pub fn last_modified(&self, key: &Key) -> Option<u64> {
        self.modified.get(key).copied()
    }

    /// Removes a key from the collection, index, and every bookkeeping
    /// map. Returns the removed record and the observers that were
    /// registered on the key.
    pub(crate) fn purge(&mut self, key: &Key) -> (Option<Record>, Vec<(ObserverId, ObserverFn)>) {
        let removed = self.cache.remove(key);
        // The cache entry may already be gone (expiry sweep); membership
        // is judged by the collection, not the index.
        let was_member = self.order.iter().any(|k| k == key);
        if was_member {
            self.order.retain(|k| k != key);
            self.collection_modified = self.tick();
        }
        self.modified.remove(key);
        self.saved.remove(key);
        self.previous.remove(key);
        self.computed_state.remove(key);
        let observers = self.observers.remove(key).unwrap_or_default();
        (removed, observers)
    }

    /// Delivers an event to the key's observers.
    pub(crate) fn notify(&self, event: &ChangeEvent) {
        if let Some(list) = self.observers.get(&event.key) {
            for (_, callback) in list {
                callback(event);
            }
        }
    }
}

impl fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStore")
            .field("records", &self.order.len())
            .field("pending_queries", &self.pending_queries.len())
            .field("completed_queries", &self.completed_queries.len())
            .field("collection_modified", &self.collection_modified)
            .finish_non_exhaustive()
    }
}
