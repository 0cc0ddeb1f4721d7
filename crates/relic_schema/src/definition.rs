//! Resource definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use relic_foundation::{Record, Value};

use crate::computed::ComputedDef;
use crate::hooks::HookSet;
use crate::relation::RelationDef;

/// A behavior method attached to a resource at registration time.
///
/// Methods form a capability table (name → function) invoked against a
/// stored record; no runtime type synthesis is involved.
pub type Method = Arc<dyn Fn(&Record) -> Value>;

/// Per-resource filter override.
///
/// When set, `filter` uses this predicate instead of the params-based
/// equality matching.
pub type FilterFn = Arc<dyn Fn(&Record) -> bool>;

/// The resolved endpoint-hierarchy parent of a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    /// Name of the parent resource.
    pub resource: String,
    /// Field on this resource's records holding the parent key.
    pub key_field: String,
}

/// A resource definition: the schema for one named record type.
///
/// Effectively immutable after registration: the rest of the system only
/// reads it. Construct with [`ResourceDefinition::new`] and the `with_*`
/// builders; a bare name is also accepted wherever a definition is
/// (`"user".into()`), picking up every default.
#[derive(Clone)]
pub struct ResourceDefinition {
    name: Arc<str>,
    id_attribute: String,
    endpoint: Option<String>,
    base_url: Option<String>,
    relations: Vec<RelationDef>,
    computed: Vec<ComputedDef>,
    hooks: HookSet,
    methods: BTreeMap<String, Method>,
    meta: Option<Value>,
    default_filter: Option<FilterFn>,
    parent: Option<ParentLink>,
}

impl ResourceDefinition {
    /// Starts a definition for the named resource.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            id_attribute: "id".to_string(),
            endpoint: None,
            base_url: None,
            relations: Vec::new(),
            computed: Vec::new(),
            hooks: HookSet::new(),
            methods: BTreeMap::new(),
            meta: None,
            default_filter: None,
            parent: None,
        }
    }

    /// Overrides the primary-key attribute (default `"id"`).
    #[must_use]
    pub fn with_id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = id_attribute.into();
        self
    }

    /// Overrides the endpoint segment (default: the resource name).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets a base URL prefixed onto resolved endpoints.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Declares a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Declares a computed field.
    #[must_use]
    pub fn with_computed(mut self, computed: ComputedDef) -> Self {
        self.computed.push(computed);
        self
    }

    /// Sets the resource-level hook set (merged over engine defaults at
    /// registration).
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }

    /// Attaches a behavior method.
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Record) -> Value + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Attaches opaque metadata the store ignores.
    #[must_use]
    pub fn with_meta(mut self, meta: impl Into<Value>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Replaces params-based filtering with a custom predicate.
    pub fn with_default_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Record) -> bool + 'static,
    {
        self.default_filter = Some(Arc::new(filter));
        self
    }

    /// The resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource name as a shared string.
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// The primary-key attribute.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    /// The endpoint segment (falls back to the resource name).
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.name)
    }

    /// The base URL, if configured.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Declared relations, in declaration order.
    #[must_use]
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Finds a relation by its related-resource name or local field.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.related == name || r.local_field == name)
    }

    /// Declared computed fields, in declaration order.
    #[must_use]
    pub fn computed(&self) -> &[ComputedDef] {
        &self.computed
    }

    /// The resolved hook set.
    #[must_use]
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Looks up a behavior method.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// The opaque metadata, if any.
    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// The filter override, if configured.
    #[must_use]
    pub fn default_filter(&self) -> Option<&FilterFn> {
        self.default_filter.as_ref()
    }

    /// The resolved endpoint-hierarchy parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub(crate) fn set_hooks(&mut self, hooks: HookSet) {
        self.hooks = hooks;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ParentLink>) {
        self.parent = parent;
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("endpoint", &self.endpoint())
            .field("relations", &self.relations)
            .field("computed", &self.computed)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl From<&str> for ResourceDefinition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceDefinition {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
