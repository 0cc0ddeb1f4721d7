//! The engine facade: store + adapter, lifecycle pipelines, and
//! read-side query dedup.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use relic_foundation::{Error, Key, Params, Record, RecordRef, Result, Value};
use relic_schema::{HookSet, HookStage, RelationKind, ResourceDefinition};
use relic_storage::{CacheConfig, Store};

use crate::adapter::Adapter;
use crate::lifecycle::{self, VALIDATION};
use crate::query;

/// Options for `find`/`findAll`.
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    /// Skip the cached record / fulfilled-query memo and hit the adapter.
    pub bypass_cache: bool,
    /// Query params forwarded to the adapter and used for dedup
    /// signatures.
    pub params: Params,
}

impl FindOptions {
    /// Default options: serve from the store when possible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces adapter I/O even when the store could answer.
    #[must_use]
    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    /// Sets the query params.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Options for `save`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveOptions {
    /// Send only the attributes that changed since the saved snapshot
    /// (plus the key), rather than the whole record.
    pub changes_only: bool,
}

/// The relic engine: the store plus the adapter boundary.
///
/// Write operations run the strict lifecycle pipelines; a hook or adapter
/// failure aborts the remaining steps and leaves the store as it was,
/// aside from adapter side effects already committed, which this engine
/// never rolls back.
pub struct Engine {
    store: Store,
    adapter: Arc<dyn Adapter>,
}

impl Engine {
    /// Creates an engine over a fresh store.
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            store: Store::new(),
            adapter,
        }
    }

    /// Creates an engine over a pre-configured store.
    #[must_use]
    pub fn with_store(store: Store, adapter: Arc<dyn Adapter>) -> Self {
        Self { store, adapter }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Registers a resource, returning its name-bound handle.
    ///
    /// # Errors
    ///
    /// `InvalidDefinition`, `AlreadyRegistered`.
    pub fn register(
        &mut self,
        definition: impl Into<ResourceDefinition>,
    ) -> Result<ResourceHandle> {
        let name = self.store.register(definition)?;
        Ok(ResourceHandle { name })
    }

    /// Registers a resource with its own cache configuration.
    ///
    /// # Errors
    ///
    /// `InvalidDefinition`, `AlreadyRegistered`.
    pub fn register_with_cache(
        &mut self,
        definition: impl Into<ResourceDefinition>,
        cache: CacheConfig,
    ) -> Result<ResourceHandle> {
        let name = self.store.register_with_cache(definition, cache)?;
        Ok(ResourceHandle { name })
    }

    // --- Write pipelines ---

    /// Creates a record: beforeValidate → validate → afterValidate →
    /// beforeCreate → adapter.create → afterCreate → inject.
    ///
    /// # Errors
    ///
    /// `ValidationFailed`/`HookFailed` abort before the adapter call;
    /// `Adapter` errors leave the store untouched; an `afterCreate`
    /// failure leaves the remote write committed but nothing injected.
    pub fn create(&mut self, resource: &str, attrs: Record) -> Result<Record> {
        let hooks = self.hooks(resource)?;
        let attrs = lifecycle::run_stages(&hooks, &VALIDATION, resource, attrs)?;
        let attrs = lifecycle::run_stage(&hooks, HookStage::BeforeCreate, resource, attrs)?;

        let raw = self.adapter.create(resource, &attrs)?;
        let data = Self::record_from(raw, attrs, "create")?;

        let data = lifecycle::run_stage(&hooks, HookStage::AfterCreate, resource, data)?;
        debug!(resource, "create");
        self.store.inject(resource, data)
    }

    /// Updates a record: beforeValidate → validate → afterValidate →
    /// beforeUpdate → adapter.update → afterUpdate → inject.
    ///
    /// # Errors
    ///
    /// As [`Engine::create`], with the update-family hooks.
    pub fn update(&mut self, resource: &str, key: &Key, attrs: Record) -> Result<Record> {
        let hooks = self.hooks(resource)?;
        let id_attribute = self.id_attribute(resource)?;

        let attrs = lifecycle::run_stages(&hooks, &VALIDATION, resource, attrs)?;
        let attrs = lifecycle::run_stage(&hooks, HookStage::BeforeUpdate, resource, attrs)?;

        let raw = self.adapter.update(resource, key, &attrs)?;
        let mut data = Self::record_from(raw, attrs, "update")?;
        if data.key(&id_attribute).is_none() {
            data.set(id_attribute, key.to_value());
        }

        let data = lifecycle::run_stage(&hooks, HookStage::AfterUpdate, resource, data)?;
        debug!(resource, key = %key, "update");
        self.store.inject(resource, data)
    }

    /// Saves a stored record through the update pipeline, optionally
    /// sending only the attributes that changed since the saved snapshot.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if the key isn't stored; otherwise as
    /// [`Engine::update`].
    pub fn save(&mut self, resource: &str, key: &Key, opts: &SaveOptions) -> Result<Record> {
        let current = self
            .store
            .get(resource, key)?
            .ok_or_else(|| Error::record_not_found(resource, key.clone()))?;

        let attrs = if opts.changes_only {
            let id_attribute = self.id_attribute(resource)?;
            let mut diff = self.store.changes(resource, key)?.unwrap_or_default();
            diff.set(id_attribute, key.to_value());
            diff
        } else {
            current
        };
        self.update(resource, key, attrs)
    }

    /// Destroys a record: beforeValidate → validate → afterValidate →
    /// beforeDestroy → adapter.destroy → afterDestroy → eject.
    ///
    /// Returns the ejected record.
    ///
    /// # Errors
    ///
    /// A failing adapter call leaves the record in the store. An
    /// `afterDestroy` failure surfaces as `HookFailed` with the remote
    /// delete committed and the record still stored.
    pub fn destroy(&mut self, resource: &str, key: &Key) -> Result<Option<Record>> {
        let hooks = self.hooks(resource)?;
        let id_attribute = self.id_attribute(resource)?;
        let attrs = self
            .store
            .get(resource, key)?
            .unwrap_or_else(|| Record::new().with(id_attribute, key.to_value()));

        let attrs = lifecycle::run_stages(&hooks, &VALIDATION, resource, attrs)?;
        let attrs = lifecycle::run_stage(&hooks, HookStage::BeforeDestroy, resource, attrs)?;

        self.adapter.destroy(resource, key)?;

        lifecycle::run_stage(&hooks, HookStage::AfterDestroy, resource, attrs)?;
        debug!(resource, key = %key, "destroy");
        self.store.eject(resource, key)
    }

    // --- Reads with dedup bookkeeping ---

    /// Finds one record, serving from the store when already loaded.
    ///
    /// A structurally-identical request issued while the first is marked
    /// pending, or after it completed, reuses the stored record instead
    /// of re-issuing adapter I/O.
    ///
    /// # Errors
    ///
    /// `Adapter` errors pass through with the pending marker cleared and
    /// the store untouched.
    pub fn find(&mut self, resource: &str, key: &Key, opts: &FindOptions) -> Result<Record> {
        if !opts.bypass_cache {
            if let Some(found) = self.store.get(resource, key)? {
                return Ok(found);
            }
        }

        let sig = query::signature("find", resource, Some(key), &opts.params);
        self.store.mark_query_pending(resource, &sig)?;

        let raw = match self.adapter.find(resource, key, &opts.params) {
            Ok(raw) => raw,
            Err(e) => {
                self.store.clear_query_pending(resource, &sig)?;
                return Err(e);
            }
        };
        let Some(data) = Record::from_value(&raw) else {
            self.store.clear_query_pending(resource, &sig)?;
            return Err(Error::adapter(format!(
                "find returned non-record data ({})",
                raw.type_name()
            )));
        };

        let stored = match self.store.inject(resource, data) {
            Ok(stored) => stored,
            Err(e) => {
                self.store.clear_query_pending(resource, &sig)?;
                return Err(e);
            }
        };
        self.store.mark_query_completed(resource, &sig)?;
        debug!(resource, key = %key, "find (adapter)");
        Ok(stored)
    }

    /// Finds all records matching `params`.
    ///
    /// A fulfilled signature answers from the store's filtered
    /// collection; otherwise the adapter is called once and the results
    /// injected.
    ///
    /// # Errors
    ///
    /// As [`Engine::find`].
    pub fn find_all(
        &mut self,
        resource: &str,
        params: &Params,
        opts: &FindOptions,
    ) -> Result<Vec<Record>> {
        let sig = query::signature("findAll", resource, None, params);
        if !opts.bypass_cache && self.store.is_query_completed(resource, &sig)? {
            return Ok(self.store.filter(resource, params)?.collect());
        }

        self.store.mark_query_pending(resource, &sig)?;
        let raw = match self.adapter.find_all(resource, params) {
            Ok(raw) => raw,
            Err(e) => {
                self.store.clear_query_pending(resource, &sig)?;
                return Err(e);
            }
        };

        let Some(items) = raw.as_list().cloned() else {
            self.store.clear_query_pending(resource, &sig)?;
            return Err(Error::adapter(format!(
                "findAll returned non-list data ({})",
                raw.type_name()
            )));
        };
        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            let Some(record) = Record::from_value(item) else {
                self.store.clear_query_pending(resource, &sig)?;
                return Err(Error::adapter(format!(
                    "findAll returned a non-record element ({})",
                    item.type_name()
                )));
            };
            records.push(record);
        }

        let stored = match self.store.inject_all(resource, records) {
            Ok(stored) => stored,
            Err(e) => {
                self.store.clear_query_pending(resource, &sig)?;
                return Err(e);
            }
        };
        self.store.mark_query_completed(resource, &sig)?;
        debug!(resource, count = stored.len(), "findAll (adapter)");
        Ok(stored)
    }

    // --- Relations ---

    /// Loads the named relations for a stored record via the adapter and
    /// links them in.
    ///
    /// Relations resolve in the requested order. The first failure
    /// surfaces as `RelationFetch` naming the relation; relations already
    /// loaded stay linked.
    ///
    /// # Errors
    ///
    /// `UnknownRelation` for names the definition does not declare,
    /// `RecordNotFound` for an unloaded key, `RelationFetch` for fetch or
    /// inject failures.
    pub fn load_relations(
        &mut self,
        resource: &str,
        key: &Key,
        relations: &[&str],
    ) -> Result<Record> {
        let def = self
            .store
            .definition(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?;
        let requested: Vec<_> = relations
            .iter()
            .map(|name| {
                def.relation(name)
                    .cloned()
                    .ok_or_else(|| Error::unknown_relation(resource, *name))
            })
            .collect::<Result<_>>()?;

        let record = self
            .store
            .get(resource, key)?
            .ok_or_else(|| Error::record_not_found(resource, key.clone()))?;

        for relation in requested {
            match relation.kind {
                RelationKind::BelongsTo => {
                    let local_key = relation.local_key.clone().unwrap_or_default();
                    let Some(target) = record.get(&local_key).and_then(Key::from_value) else {
                        return Err(Error::relation_fetch(
                            &relation.related,
                            format!("record carries no {local_key} key"),
                        ));
                    };
                    let raw = self
                        .adapter
                        .find(&relation.related, &target, &Params::new())
                        .map_err(|e| Error::relation_fetch(&relation.related, e.to_string()))?;
                    let data = Record::from_value(&raw).ok_or_else(|| {
                        Error::relation_fetch(&relation.related, "adapter returned non-record data")
                    })?;
                    let stored = self
                        .store
                        .inject(&relation.related, data)
                        .map_err(|e| Error::relation_fetch(&relation.related, e.to_string()))?;

                    let related_id = self.id_attribute(&relation.related)?;
                    if let Some(stored_key) = stored.key(&related_id) {
                        self.store.set(
                            resource,
                            key,
                            relation.local_field.clone(),
                            Value::Ref(RecordRef::new(relation.related.clone(), stored_key)),
                        )?;
                    }
                }
                RelationKind::HasOne | RelationKind::HasMany => {
                    let foreign_key = relation.foreign_key.clone().unwrap_or_default();
                    let params = Params::new().where_eq(foreign_key, key.to_value());
                    let raw = self
                        .adapter
                        .find_all(&relation.related, &params)
                        .map_err(|e| Error::relation_fetch(&relation.related, e.to_string()))?;
                    let Some(items) = raw.as_list().cloned() else {
                        return Err(Error::relation_fetch(
                            &relation.related,
                            "adapter returned non-list data",
                        ));
                    };
                    let mut fetched = Vec::with_capacity(items.len());
                    for item in &items {
                        let data = Record::from_value(item).ok_or_else(|| {
                            Error::relation_fetch(
                                &relation.related,
                                "adapter returned a non-record element",
                            )
                        })?;
                        fetched.push(data);
                    }
                    let stored = self
                        .store
                        .inject_all(&relation.related, fetched)
                        .map_err(|e| Error::relation_fetch(&relation.related, e.to_string()))?;

                    let related_id = self.id_attribute(&relation.related)?;
                    if relation.kind == RelationKind::HasOne {
                        if let Some(link) = stored.first().and_then(|r| r.key(&related_id)) {
                            self.store.set(
                                resource,
                                key,
                                relation.local_field.clone(),
                                Value::Ref(RecordRef::new(relation.related.clone(), link)),
                            )?;
                        }
                    } else {
                        let links: Vec<Value> = stored
                            .iter()
                            .filter_map(|r| r.key(&related_id))
                            .map(|k| Value::Ref(RecordRef::new(relation.related.clone(), k)))
                            .collect();
                        self.store.set(
                            resource,
                            key,
                            relation.local_field.clone(),
                            Value::from(links),
                        )?;
                    }
                }
            }
            debug!(resource, key = %key, relation = %relation.local_field, "relation loaded");
        }

        self.store
            .get(resource, key)?
            .ok_or_else(|| Error::record_not_found(resource, key.clone()))
    }

    /// Recomputes dirty computed fields across all resources.
    ///
    /// # Errors
    ///
    /// The first derivation error encountered.
    pub fn digest(&mut self) -> Result<()> {
        self.store.digest()
    }

    // --- Internals ---

    fn hooks(&self, resource: &str) -> Result<HookSet> {
        Ok(self
            .store
            .definition(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?
            .hooks()
            .clone())
    }

    fn id_attribute(&self, resource: &str) -> Result<String> {
        Ok(self
            .store
            .definition(resource)
            .ok_or_else(|| Error::unknown_resource(resource))?
            .id_attribute()
            .to_string())
    }

    fn record_from(raw: Value, fallback: Record, verb: &str) -> Result<Record> {
        match raw {
            // Echo-nothing backends: trust the attributes we sent.
            Value::Null => Ok(fallback),
            other => Record::from_value(&other).ok_or_else(|| {
                Error::adapter(format!(
                    "{verb} returned non-record data ({})",
                    other.type_name()
                ))
            }),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A name-bound forwarding handle for one registered resource.
///
/// The handle carries only the resource name; every method takes the
/// engine explicitly, keeping mutation points visible instead of hiding
/// shared state inside the handle.
#[derive(Clone, Debug)]
pub struct ResourceHandle {
    name: Arc<str>,
}

impl ResourceHandle {
    /// The resource name this handle is bound to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forwards to [`relic_storage::Store::inject`].
    pub fn inject(&self, engine: &mut Engine, record: Record) -> Result<Record> {
        engine.store_mut().inject(&self.name, record)
    }

    /// Forwards to [`relic_storage::Store::eject`].
    pub fn eject(&self, engine: &mut Engine, key: &Key) -> Result<Option<Record>> {
        engine.store_mut().eject(&self.name, key)
    }

    /// Forwards to [`relic_storage::Store::get`].
    pub fn get(&self, engine: &mut Engine, key: &Key) -> Result<Option<Record>> {
        engine.store_mut().get(&self.name, key)
    }

    /// Forwards to [`relic_storage::Store::filter`].
    pub fn filter<'a>(
        &self,
        engine: &'a Engine,
        params: &Params,
    ) -> Result<Box<dyn Iterator<Item = Record> + 'a>> {
        engine.store().filter(&self.name, params)
    }

    /// Forwards to [`Engine::create`].
    pub fn create(&self, engine: &mut Engine, attrs: Record) -> Result<Record> {
        engine.create(&self.name, attrs)
    }

    /// Forwards to [`Engine::update`].
    pub fn update(&self, engine: &mut Engine, key: &Key, attrs: Record) -> Result<Record> {
        engine.update(&self.name, key, attrs)
    }

    /// Forwards to [`Engine::save`].
    pub fn save(&self, engine: &mut Engine, key: &Key, opts: &SaveOptions) -> Result<Record> {
        engine.save(&self.name, key, opts)
    }

    /// Forwards to [`Engine::destroy`].
    pub fn destroy(&self, engine: &mut Engine, key: &Key) -> Result<Option<Record>> {
        engine.destroy(&self.name, key)
    }

    /// Forwards to [`Engine::find`].
    pub fn find(&self, engine: &mut Engine, key: &Key, opts: &FindOptions) -> Result<Record> {
        engine.find(&self.name, key, opts)
    }

    /// Forwards to [`Engine::find_all`].
    pub fn find_all(
        &self,
        engine: &mut Engine,
        params: &Params,
        opts: &FindOptions,
    ) -> Result<Vec<Record>> {
        engine.find_all(&self.name, params, opts)
    }

    /// Forwards to [`Engine::load_relations`].
    pub fn load_relations(
        &self,
        engine: &mut Engine,
        key: &Key,
        relations: &[&str],
    ) -> Result<Record> {
        engine.load_relations(&self.name, key, relations)
    }
}
