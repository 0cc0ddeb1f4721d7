//! The store facade: registration, record lifecycle, and the digest
//! cycle across all registered resources.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use relic_foundation::{
    ChangeEvent, ChangeKind, Error, ErrorKind, Key, ObserverId, Params, Record, RecordRef, Result,
    Value,
};
use relic_schema::{
    EndpointOptions, EngineDefaults, HookStage, Registry, RelationKind, ResourceDefinition,
};

use crate::cache::{Cache, CacheConfig, Clock, DeleteOnExpire, SystemClock};
use crate::link;
use crate::resource::ResourceStore;

/// Result of resolving a relation field.
#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    /// hasOne / belongsTo resolution.
    One(Option<Record>),
    /// hasMany resolution.
    Many(Vec<Record>),
}

/// The relic store: one [`ResourceStore`] per registered resource, plus
/// the schema registry that governs them.
///
/// Single-threaded by design: every operation runs to completion, so the
/// collection/index invariants hold continuously between calls.
/// Cross-resource data flows only through [`Value::Ref`] links; callers
/// never reach into another resource's maps directly.
pub struct Store {
    registry: Registry,
    resources: HashMap<String, ResourceStore>,
    defaults: EngineDefaults,
    cache_config: CacheConfig,
    clock: Arc<dyn Clock>,
    next_observer: u64,
    observer_index: HashMap<ObserverId, (Arc<str>, Key)>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store with the system clock and no defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            resources: HashMap::new(),
            defaults: EngineDefaults::new(),
            cache_config: CacheConfig::new(),
            clock: Arc::new(SystemClock),
            next_observer: 0,
            observer_index: HashMap::new(),
        }
    }

    /// Sets the engine defaults merged under every registration.
    #[must_use]
    pub fn with_defaults(mut self, defaults: EngineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the cache config used by `register` (overridable per resource
    /// via [`Store::register_with_cache`]).
    #[must_use]
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Sets the clock used by the per-resource caches.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // --- Registration ---

    /// Registers a resource and allocates its cache and entity store.
    ///
    /// # Errors
    ///
    /// `InvalidDefinition` or `AlreadyRegistered`; on failure no partial
    /// definition, cache, or store entry remains.
    pub fn register(&mut self, definition: impl Into<ResourceDefinition>) -> Result<Arc<str>> {
        let cache_config = self.cache_config.clone();
        self.register_with_cache(definition, cache_config)
    }

    /// Registers a resource with its own cache configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Store::register`].
    pub fn register_with_cache(
        &mut self,
        definition: impl Into<ResourceDefinition>,
        cache: CacheConfig,
    ) -> Result<Arc<str>> {
        let defaults = self.defaults.clone();
        let name = self.registry.register(definition, &defaults)?.name_arc();
        self.resources.insert(
            name.to_string(),
            ResourceStore::new(Cache::new(cache, Arc::clone(&self.clock))),
        );
        debug!(resource = %name, "registered");
        Ok(name)
    }

    /// Returns the definition for a registered resource.
    #[must_use]
    pub fn definition(&self, resource: &str) -> Option<&ResourceDefinition> {
        self.registry.get(resource)
    }

    /// Returns true if the resource is registered.
    #[must_use]
    pub fn is_registered(&self, resource: &str) -> bool {
        self.registry.is_registered(resource)
    }

    /// Read-only view of a resource's entity store.
    pub fn resource(&self, resource: &str) -> Result<&ResourceStore> {
        self.registry.expect(resource)?;
        self.resources
            .get(resource)
            .ok_or_else(|| Error::unknown_resource(resource))
    }

    // --- Inject / eject ---

    /// Decomposes and stores a record, returning the stored copy.
    ///
    /// Nested relation data is split into the related resources' stores,
    /// children before parents, and the relation fields are replaced with
    /// links. `beforeInject`/`afterInject` hooks run per stored record;
    /// computed fields are seeded immediately.
    ///
    /// Injecting an identical record twice is idempotent: the stored
    /// state is unchanged and the collection gains no duplicate, though
    /// `afterInject` still fires and the previous-attributes snapshot
    /// tracks the prior copy.
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `MissingKey` (record or nested child without a
    /// usable key, detected before any mutation), `HookFailed`, or a
    /// computed-derivation error.
    pub fn inject(&mut self, resource: &str, record: Record) -> Result<Record> {
        let mut insertions = Vec::new();
        link::decompose(&self.registry, resource, record, &mut insertions)?;

        let mut root_key = None;
        for insertion in insertions {
            let key = self.apply_insertion(&insertion.resource, insertion.record)?;
            root_key = Some(key);
        }
        // Decomposition always emits the root record last.
        let root_key =
            root_key.ok_or_else(|| Error::internal("inject decomposed to no insertions"))?;
        self.peek(resource, &root_key)
            .cloned()
            .ok_or_else(|| Error::internal("injected record missing from its own store"))
    }

    /// Injects a batch of records in order, returning the stored copies.
    ///
    /// # Errors
    ///
    /// As [`Store::inject`]; records before the failing one stay stored.
    pub fn inject_all(
        &mut self,
        resource: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<Record>> {
        records
            .into_iter()
            .map(|record| self.inject(resource, record))
            .collect()
    }

    /// Removes a record and all its bookkeeping from its store.
    ///
    /// Absent keys are a no-op returning `None`, not a failure. Observers
    /// receive `Ejected` and are then dropped.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn eject(&mut self, resource: &str, key: &Key) -> Result<Option<Record>> {
        let name = self.registry.expect(resource)?.name_arc();
        let removed = self.purge_key(&name, key, false);
        if removed.is_some() {
            debug!(resource, key = %key, "eject");
        }
        Ok(removed)
    }

    /// Ejects every record matching `params`, returning the removed
    /// records.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn eject_all(&mut self, resource: &str, params: &Params) -> Result<Vec<Record>> {
        let def = self.registry.expect(resource)?;
        let id_attribute = def.id_attribute().to_string();
        let keys: Vec<Key> = self
            .filter(resource, params)?
            .filter_map(|record| record.key(&id_attribute))
            .collect();

        let mut removed = Vec::new();
        for key in keys {
            if let Some(record) = self.eject(resource, &key)? {
                removed.push(record);
            }
        }
        Ok(removed)
    }

    // --- Reads ---

    /// Gets a record by key; O(1) via the index.
    ///
    /// Under the `Passive` expiry policy an expired record is evicted
    /// here, ejected from the store, and reported as absent, identical
    /// to a never-inserted key.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn get(&mut self, resource: &str, key: &Key) -> Result<Option<Record>> {
        let name = self.registry.expect(resource)?.name_arc();
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;

        if rs.cache.policy() == DeleteOnExpire::Passive && rs.cache.is_expired(key) {
            rs.cache.reap_if_expired(key);
            self.purge_key(&name, key, true);
            trace!(resource, key = %key, "passive expiry on access");
            return Ok(None);
        }
        Ok(rs.cache.get(key).cloned())
    }

    /// Returns every record in insertion order.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn get_all(&self, resource: &str) -> Result<Vec<Record>> {
        let rs = self.resource(resource)?;
        Ok(rs
            .order
            .iter()
            .filter_map(|key| rs.cache.get(key))
            .cloned()
            .collect())
    }

    /// Lazily filters the live collection.
    ///
    /// The sequence is finite and restartable: each call re-filters the
    /// collection as it stands, never a cached snapshot. A
    /// `default_filter` on the definition replaces the params predicate;
    /// `order_by` sorts (materializing the matches), then `skip`/`limit`
    /// window the result.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn filter<'a>(
        &'a self,
        resource: &str,
        params: &Params,
    ) -> Result<Box<dyn Iterator<Item = Record> + 'a>> {
        let def = self.registry.expect(resource)?;
        let rs = self.resource(resource)?;

        let predicate: Box<dyn Fn(&Record) -> bool> = match def.default_filter() {
            Some(f) => {
                let f = Arc::clone(f);
                Box::new(move |record: &Record| f(record))
            }
            None => {
                let params = params.clone();
                Box::new(move |record: &Record| params.matches(record))
            }
        };

        let skip = params.skip_count().unwrap_or(0);
        let limit = params.limit_count();
        let order = params.order().map(|(field, dir)| (field.to_string(), dir));

        if let Some((field, dir)) = order {
            let mut matches: Vec<Record> = rs
                .order
                .iter()
                .filter_map(|key| rs.cache.get(key))
                .filter(|record| predicate(record))
                .cloned()
                .collect();
            matches.sort_by(|a, b| {
                let va = a.get(&field).cloned().unwrap_or(Value::Null);
                let vb = b.get(&field).cloned().unwrap_or(Value::Null);
                match dir {
                    relic_foundation::SortOrder::Asc => va.compare(&vb),
                    relic_foundation::SortOrder::Desc => vb.compare(&va),
                }
            });
            let iter = matches.into_iter().skip(skip);
            Ok(match limit {
                Some(n) => Box::new(iter.take(n)),
                None => Box::new(iter),
            })
        } else {
            let iter = rs
                .order
                .iter()
                .filter_map(move |key| rs.cache.get(key))
                .filter(move |record| predicate(record))
                .cloned()
                .skip(skip);
            Ok(match limit {
                Some(n) => Box::new(iter.take(n)),
                None => Box::new(iter),
            })
        }
    }

    // --- Mutation and snapshots ---

    /// Sets one attribute on a stored record.
    ///
    /// Computed fields are NOT recomputed here; derived state catches up
    /// on the next [`Store::digest`].
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `RecordNotFound`.
    pub fn set(
        &mut self,
        resource: &str,
        key: &Key,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let name = self.registry.expect(resource)?.name_arc();
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let Some(record) = rs.cache.get_mut(key) else {
            return Err(Error::record_not_found(resource, key.clone()));
        };
        record.set(field, value);
        rs.mark_modified(key);

        let event = ChangeEvent {
            resource: name,
            key: key.clone(),
            kind: ChangeKind::Updated,
        };
        if let Some(rs) = self.resources.get(resource) {
            rs.notify(&event);
        }
        Ok(())
    }

    /// Returns the attribute values a record held before its last inject,
    /// or `None` for records injected only once.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn previous(&self, resource: &str, key: &Key) -> Result<Option<Record>> {
        Ok(self.resource(resource)?.previous.get(key).cloned())
    }

    /// Diffs the current record against its saved snapshot.
    ///
    /// Returns `None` if the record is absent.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn changes(&self, resource: &str, key: &Key) -> Result<Option<Record>> {
        let rs = self.resource(resource)?;
        let Some(current) = rs.cache.get(key) else {
            return Ok(None);
        };
        let saved = rs.saved.get(key).cloned().unwrap_or_default();
        Ok(Some(current.diff(&saved)))
    }

    /// Returns true if the record differs from its saved snapshot.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn has_changes(&self, resource: &str, key: &Key) -> Result<bool> {
        Ok(self
            .changes(resource, key)?
            .is_some_and(|diff| !diff.is_empty()))
    }

    /// Makes the record's current state its saved snapshot.
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `RecordNotFound`.
    pub fn commit(&mut self, resource: &str, key: &Key) -> Result<()> {
        self.registry.expect(resource)?;
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let Some(current) = rs.cache.get(key).cloned() else {
            return Err(Error::record_not_found(resource, key.clone()));
        };
        rs.saved.insert(key.clone(), current);
        Ok(())
    }

    /// Restores the record to its saved snapshot, returning the restored
    /// copy.
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `RecordNotFound`.
    pub fn revert(&mut self, resource: &str, key: &Key) -> Result<Record> {
        let name = self.registry.expect(resource)?.name_arc();
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        if !rs.cache.contains(key) {
            return Err(Error::record_not_found(resource, key.clone()));
        }
        let Some(saved) = rs.saved.get(key).cloned() else {
            return Err(Error::record_not_found(resource, key.clone()));
        };
        rs.cache.put(key.clone(), saved.clone());
        rs.mark_modified(key);

        let event = ChangeEvent {
            resource: name,
            key: key.clone(),
            kind: ChangeKind::Updated,
        };
        if let Some(rs) = self.resources.get(resource) {
            rs.notify(&event);
        }
        Ok(saved)
    }

    /// Returns the modification stamp for a key, or the collection-level
    /// stamp when `key` is `None`.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn last_modified(&self, resource: &str, key: Option<&Key>) -> Result<Option<u64>> {
        let rs = self.resource(resource)?;
        Ok(match key {
            Some(key) => rs.last_modified(key),
            None => Some(rs.collection_modified()),
        })
    }

    // --- Observers ---

    /// Registers a change observer for a record key.
    ///
    /// The callback runs synchronously during the mutating operation and
    /// is dropped when the record is ejected (after receiving `Ejected`).
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn observe<F>(&mut self, resource: &str, key: &Key, callback: F) -> Result<ObserverId>
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        let name = self.registry.expect(resource)?.name_arc();
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);

        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        rs.observers
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        self.observer_index.insert(id, (name, key.clone()));
        Ok(id)
    }

    /// Unregisters an observer; returns false if the id is unknown.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let Some((name, key)) = self.observer_index.remove(&id) else {
            return false;
        };
        if let Some(rs) = self.resources.get_mut(name.as_ref()) {
            if let Some(list) = rs.observers.get_mut(&key) {
                list.retain(|(observer, _)| *observer != id);
                if list.is_empty() {
                    rs.observers.remove(&key);
                }
            }
        }
        true
    }

    // --- Relations ---

    /// Resolves a relation field on a stored record.
    ///
    /// Stored links resolve directly; otherwise hasMany filters the
    /// related store on the foreign key, belongsTo follows the local key,
    /// and hasOne scans the related store for the first foreign-key
    /// match.
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `UnknownRelation`, `RecordNotFound`.
    pub fn related(&self, resource: &str, key: &Key, field: &str) -> Result<Related> {
        let def = self.registry.expect(resource)?;
        let relation = def
            .relation(field)
            .ok_or_else(|| Error::unknown_relation(resource, field))?
            .clone();
        let rs = self.resource(resource)?;
        let record = rs
            .cache
            .get(key)
            .ok_or_else(|| Error::record_not_found(resource, key.clone()))?;

        // A stored link resolves directly.
        match record.get(&relation.local_field) {
            Some(Value::Ref(link)) => return Ok(Related::One(self.lookup_ref(link))),
            Some(Value::List(items)) if items.iter().any(|v| matches!(v, Value::Ref(_))) => {
                let found = items
                    .iter()
                    .filter_map(Value::as_ref_value)
                    .filter_map(|link| self.lookup_ref(link))
                    .collect();
                return Ok(Related::Many(found));
            }
            _ => {}
        }

        if !self.registry.is_registered(&relation.related) {
            return Ok(match relation.kind {
                RelationKind::HasMany => Related::Many(Vec::new()),
                _ => Related::One(None),
            });
        }

        match relation.kind {
            RelationKind::BelongsTo => {
                let target = relation
                    .local_key
                    .as_deref()
                    .and_then(|field| record.get(field))
                    .and_then(Key::from_value);
                Ok(Related::One(target.and_then(|target_key| {
                    self.peek(&relation.related, &target_key).cloned()
                })))
            }
            RelationKind::HasOne => {
                Ok(Related::One(self.scan_foreign(&relation, key)?.pop()))
            }
            RelationKind::HasMany => Ok(Related::Many(self.scan_foreign(&relation, key)?)),
        }
    }

    fn scan_foreign(
        &self,
        relation: &relic_schema::RelationDef,
        key: &Key,
    ) -> Result<Vec<Record>> {
        let foreign_key = relation.foreign_key.clone().unwrap_or_default();
        let target = key.to_value();
        let related_rs = self.resource(&relation.related)?;
        Ok(related_rs
            .order
            .iter()
            .filter_map(|k| related_rs.cache.get(k))
            .filter(|record| record.get(&foreign_key) == Some(&target))
            .cloned()
            .collect())
    }

    fn lookup_ref(&self, link: &RecordRef) -> Option<Record> {
        self.peek(&link.resource, &link.key).cloned()
    }

    // --- Endpoint resolution ---

    /// Resolves the (possibly hierarchical) endpoint for a resource,
    /// consulting already-injected records for parent keys.
    ///
    /// # Errors
    ///
    /// `UnknownResource`; `Internal` on a parent declaration cycle.
    pub fn endpoint(
        &self,
        resource: &str,
        attrs: Option<&Record>,
        opts: &EndpointOptions,
    ) -> Result<String> {
        let lookup = |name: &str, key: &Key| self.peek(name, key).cloned();
        self.registry.endpoint(resource, attrs, opts, &lookup)
    }

    // --- Digest ---

    /// Recomputes every computed field whose dependencies changed since
    /// the last digest, across all resources in registration order.
    ///
    /// Observers of recomputed records receive
    /// [`ChangeKind::Computed`]. A failing derivation propagates
    /// immediately: records already processed keep their updates,
    /// unprocessed ones are untouched.
    ///
    /// # Errors
    ///
    /// The first derivation error encountered.
    pub fn digest(&mut self) -> Result<()> {
        trace!("digest pass");
        let names: Vec<String> = self.registry.names().map(String::from).collect();
        for name in names {
            let Some(def) = self.registry.get(&name) else {
                continue;
            };
            if def.computed().is_empty() {
                continue;
            }
            let computed = def.computed().to_vec();
            let name_arc = def.name_arc();

            let keys: Vec<Key> = self
                .resources
                .get(&name)
                .map(|rs| rs.order.clone())
                .unwrap_or_default();

            for key in keys {
                for def in &computed {
                    let Some(rs) = self.resources.get_mut(&name) else {
                        continue;
                    };
                    let Some(record) = rs.cache.get(&key) else {
                        continue;
                    };
                    let deps = def.dep_values(record);
                    let unchanged = rs
                        .computed_state
                        .get(&key)
                        .and_then(|fields| fields.get(&def.field))
                        .is_some_and(|prev| *prev == deps);
                    if unchanged {
                        continue;
                    }

                    let value = def.evaluate_with(&deps)?;
                    if let Some(record) = rs.cache.get_mut(&key) {
                        record.set(def.field.clone(), value);
                    }
                    rs.computed_state
                        .entry(key.clone())
                        .or_default()
                        .insert(def.field.clone(), deps);
                    rs.mark_modified(&key);
                    trace!(resource = %name, key = %key, field = %def.field, "recomputed");

                    let event = ChangeEvent {
                        resource: Arc::clone(&name_arc),
                        key: key.clone(),
                        kind: ChangeKind::Computed(def.field.clone()),
                    };
                    if let Some(rs) = self.resources.get(&name) {
                        rs.notify(&event);
                    }
                }
            }
        }
        Ok(())
    }

    // --- Methods ---

    /// Invokes a behavior method from the resource's capability table
    /// against a stored record.
    ///
    /// # Errors
    ///
    /// `UnknownResource`, `UnknownMethod`, `RecordNotFound`.
    pub fn call_method(&self, resource: &str, key: &Key, method: &str) -> Result<Value> {
        let def = self.registry.expect(resource)?;
        let function = def.method(method).ok_or_else(|| {
            Error::new(ErrorKind::UnknownMethod {
                resource: resource.to_string(),
                method: method.to_string(),
            })
        })?;
        let record = self
            .peek(resource, key)
            .ok_or_else(|| Error::record_not_found(resource, key.clone()))?;
        Ok(function(record))
    }

    // --- Expiry sweeps ---

    /// Runs the expiry sweep for one resource, ejecting every evicted
    /// record. Returns the evicted keys.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn sweep(&mut self, resource: &str) -> Result<Vec<Key>> {
        let name = self.registry.expect(resource)?.name_arc();
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let evicted = rs.cache.sweep();
        for key in &evicted {
            self.purge_key(&name, key, true);
            debug!(resource, key = %key, "expired");
        }
        Ok(evicted)
    }

    /// Runs [`Store::sweep`] only if the resource's recycle interval has
    /// elapsed.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn maybe_sweep(&mut self, resource: &str) -> Result<Vec<Key>> {
        let name = self.registry.expect(resource)?.name_arc();
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let evicted = rs.cache.maybe_sweep();
        for key in &evicted {
            self.purge_key(&name, key, true);
            debug!(resource, key = %key, "expired");
        }
        Ok(evicted)
    }

    /// Sweeps every registered resource.
    ///
    /// # Errors
    ///
    /// `UnknownResource` (unreachable for names the registry yields).
    pub fn sweep_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.registry.names().map(String::from).collect();
        for name in names {
            self.sweep(&name)?;
        }
        Ok(())
    }

    // --- Query bookkeeping ---

    /// Marks a query signature as in flight.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn mark_query_pending(&mut self, resource: &str, signature: &str) -> Result<()> {
        self.registry.expect(resource)?;
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let stamp = rs.tick();
        rs.pending_queries.insert(signature.to_string(), stamp);
        Ok(())
    }

    /// Clears an in-flight marker; returns whether it was present.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn clear_query_pending(&mut self, resource: &str, signature: &str) -> Result<bool> {
        self.registry.expect(resource)?;
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        Ok(rs.pending_queries.remove(signature).is_some())
    }

    /// Returns true if the signature is in flight.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn is_query_pending(&self, resource: &str, signature: &str) -> Result<bool> {
        Ok(self
            .resource(resource)?
            .pending_queries
            .contains_key(signature))
    }

    /// Marks a query signature as fulfilled (and no longer pending).
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn mark_query_completed(&mut self, resource: &str, signature: &str) -> Result<()> {
        self.registry.expect(resource)?;
        let rs = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        rs.pending_queries.remove(signature);
        let stamp = rs.tick();
        rs.completed_queries.insert(signature.to_string(), stamp);
        Ok(())
    }

    /// Returns true if the signature has been fulfilled.
    ///
    /// # Errors
    ///
    /// `UnknownResource`.
    pub fn is_query_completed(&self, resource: &str, signature: &str) -> Result<bool> {
        Ok(self
            .resource(resource)?
            .completed_queries
            .contains_key(signature))
    }

    // --- Internals ---

    /// Raw index lookup, no expiry handling.
    pub(crate) fn peek(&self, resource: &str, key: &Key) -> Option<&Record> {
        self.resources.get(resource).and_then(|rs| rs.cache.get(key))
    }

    fn apply_insertion(&mut self, resource: &str, record: Record) -> Result<Key> {
        let (name, id_attribute, hooks, computed) = {
            let def = self.registry.expect(resource)?;
            (
                def.name_arc(),
                def.id_attribute().to_string(),
                def.hooks().clone(),
                def.computed().to_vec(),
            )
        };

        let record = match hooks.get(HookStage::BeforeInject) {
            Some(hook) => hook(resource, &record).map_err(|e| {
                Error::hook_failed(HookStage::BeforeInject.name(), resource, e.to_string())
            })?,
            None => record,
        };

        let key = record
            .key(&id_attribute)
            .ok_or_else(|| Error::missing_key(resource, &id_attribute))?;

        let existing = self
            .resources
            .get(resource)
            .and_then(|rs| rs.cache.get(&key))
            .cloned();
        let mut stored = existing
            .as_ref()
            .map_or_else(|| record.clone(), |prev| prev.merged(&record));

        // Seed computed fields: evaluate each and snapshot its deps so the
        // next digest only recomputes on change.
        let mut snapshots = HashMap::new();
        for def in &computed {
            let deps = def.dep_values(&stored);
            let value = def.evaluate_with(&deps)?;
            stored.set(def.field.clone(), value);
            snapshots.insert(def.field.clone(), deps);
        }

        let is_new = existing.is_none();
        {
            let rs = self
                .resources
                .get_mut(resource)
                .ok_or_else(|| Error::unknown_resource(resource))?;
            rs.cache.put(key.clone(), stored.clone());
            if is_new {
                rs.order.push(key.clone());
            }
            if let Some(prev) = existing {
                rs.previous.insert(key.clone(), prev);
            }
            rs.saved.insert(key.clone(), stored.clone());
            rs.computed_state.insert(key.clone(), snapshots);
            rs.mark_modified(&key);
            rs.collection_modified = rs.tick();
        }

        // afterInject fires on every call; a failure surfaces to the
        // caller but the record stays stored.
        if let Some(hook) = hooks.get(HookStage::AfterInject) {
            hook(resource, &stored).map_err(|e| {
                Error::hook_failed(HookStage::AfterInject.name(), resource, e.to_string())
            })?;
        }

        let event = ChangeEvent {
            resource: name,
            key: key.clone(),
            kind: if is_new {
                ChangeKind::Injected
            } else {
                ChangeKind::Updated
            },
        };
        if let Some(rs) = self.resources.get(resource) {
            rs.notify(&event);
        }
        trace!(resource, key = %key, new = is_new, "inject");
        Ok(key)
    }

    /// Purges a key from every bookkeeping map, delivering `Ejected` to
    /// its observers. `force_notify` covers expiry paths where the cache
    /// entry is already gone.
    fn purge_key(&mut self, name: &Arc<str>, key: &Key, force_notify: bool) -> Option<Record> {
        let rs = self.resources.get_mut(name.as_ref())?;
        let (removed, observers) = rs.purge(key);
        for (id, _) in &observers {
            self.observer_index.remove(id);
        }
        if removed.is_some() || force_notify {
            let event = ChangeEvent {
                resource: Arc::clone(name),
                key: key.clone(),
                kind: ChangeKind::Ejected,
            };
            for (_, callback) in &observers {
                callback(&event);
            }
        }
        removed
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("resources", &self.registry.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
