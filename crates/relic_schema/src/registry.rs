//! The schema registry: name-unique definitions and endpoint resolution.

use std::collections::HashMap;
use std::sync::Arc;

use relic_foundation::{Error, Key, Params, Record, Result};

use crate::definition::{ParentLink, ResourceDefinition};
use crate::hooks::EngineDefaults;
use crate::relation::RelationKind;

/// Parent chains longer than this indicate a declaration cycle.
const MAX_PARENT_DEPTH: usize = 8;

/// Callback the endpoint resolver uses to consult already-injected
/// records for parent keys. The store supplies this; standalone registry
/// use can pass `&|_, _| None`.
pub type KeyLookup<'a> = dyn Fn(&str, &Key) -> Option<Record> + 'a;

/// Options shaping endpoint resolution.
#[derive(Clone, Debug, Default)]
pub struct EndpointOptions {
    /// When set, skip parent composition and return the flat endpoint.
    pub suppress_parent: bool,
    /// Explicit query params; a condition on the parent key field is the
    /// last-resort source for the parent key value.
    pub params: Params,
}

impl EndpointOptions {
    /// Creates default options (parent composition enabled, no params).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses parent composition.
    #[must_use]
    pub fn flat(mut self) -> Self {
        self.suppress_parent = true;
        self
    }

    /// Supplies explicit query params.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Stores one validated resource definition per name.
///
/// A name may be registered at most once; registration normalizes
/// defaults, merges engine-default hooks under resource overrides, and
/// resolves the endpoint-hierarchy parent. Failed registrations leave no
/// trace.
#[derive(Debug, Default)]
pub struct Registry {
    definitions: HashMap<String, ResourceDefinition>,
    order: Vec<Arc<str>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a definition.
    ///
    /// # Errors
    ///
    /// `InvalidDefinition` for malformed input, `AlreadyRegistered` for a
    /// duplicate name. On failure nothing is registered.
    pub fn register(
        &mut self,
        definition: impl Into<ResourceDefinition>,
        defaults: &EngineDefaults,
    ) -> Result<&ResourceDefinition> {
        let mut definition = definition.into();
        let name = definition.name().to_string();

        if name.is_empty() {
            return Err(Error::invalid_definition(
                "resource name must be a non-empty string",
            ));
        }
        if self.definitions.contains_key(&name) {
            return Err(Error::already_registered(name));
        }
        Self::validate(&definition)?;

        definition.set_parent(Self::resolve_parent(&definition));
        let merged = definition.hooks().merged_over(&defaults.hooks);
        definition.set_hooks(merged);

        self.order.push(definition.name_arc());
        Ok(self.definitions.entry(name).or_insert(definition))
    }

    /// Removes a definition, for registration rollback.
    pub fn remove(&mut self, name: &str) -> Option<ResourceDefinition> {
        self.order.retain(|n| n.as_ref() != name);
        self.definitions.remove(name)
    }

    /// Gets a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceDefinition> {
        self.definitions.get(name)
    }

    /// Gets a definition or fails with `UnknownResource`.
    pub fn expect(&self, name: &str) -> Result<&ResourceDefinition> {
        self.get(name)
            .ok_or_else(|| Error::unknown_resource(name))
    }

    /// Returns true if the name is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Iterates registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(AsRef::as_ref)
    }

    /// Returns the number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolves the endpoint for a resource, composing the parent chain.
    ///
    /// The parent key value is looked up in `attrs` first, then in the
    /// already-injected record `lookup` finds for the attrs' own key, then
    /// in `opts.params`. If no source yields a key, or `opts` suppresses
    /// parent composition, the flat endpoint is returned. The target's
    /// base URL, when configured, prefixes the result.
    ///
    /// # Errors
    ///
    /// `UnknownResource` if `name` (or a declared parent) is not
    /// registered; `Internal` if the parent chain exceeds
    /// [`MAX_PARENT_DEPTH`].
    pub fn endpoint(
        &self,
        name: &str,
        attrs: Option<&Record>,
        opts: &EndpointOptions,
        lookup: &KeyLookup<'_>,
    ) -> Result<String> {
        let path = self.endpoint_path(name, attrs, opts, lookup, 0)?;
        let def = self.expect(name)?;
        Ok(match def.base_url() {
            Some(base) => format!("{}/{path}", base.trim_end_matches('/')),
            None => path,
        })
    }

    fn endpoint_path(
        &self,
        name: &str,
        attrs: Option<&Record>,
        opts: &EndpointOptions,
        lookup: &KeyLookup<'_>,
        depth: usize,
    ) -> Result<String> {
        if depth > MAX_PARENT_DEPTH {
            return Err(Error::internal(format!(
                "parent chain for {name} exceeds {MAX_PARENT_DEPTH} levels (declaration cycle?)"
            )));
        }

        let def = self.expect(name)?;
        let segment = def.endpoint().to_string();
        if opts.suppress_parent {
            return Ok(segment);
        }
        let Some(parent) = def.parent() else {
            return Ok(segment);
        };

        let mut parent_key = attrs
            .and_then(|a| a.get(&parent.key_field))
            .and_then(Key::from_value);
        if parent_key.is_none() {
            if let Some(stored) = attrs
                .and_then(|a| a.key(def.id_attribute()))
                .and_then(|own| lookup(name, &own))
            {
                parent_key = stored.get(&parent.key_field).and_then(Key::from_value);
            }
        }
        if parent_key.is_none() {
            parent_key = opts
                .params
                .condition(&parent.key_field)
                .and_then(Key::from_value);
        }

        match parent_key {
            None => Ok(segment),
            Some(pk) => {
                let parent_attrs = lookup(&parent.resource, &pk);
                let parent_path = self.endpoint_path(
                    &parent.resource,
                    parent_attrs.as_ref(),
                    opts,
                    lookup,
                    depth + 1,
                )?;
                Ok(format!("{parent_path}/{pk}/{segment}"))
            }
        }
    }

    fn validate(definition: &ResourceDefinition) -> Result<()> {
        if definition.id_attribute().is_empty() {
            return Err(Error::invalid_definition(
                "id attribute must be a non-empty string",
            ));
        }
        if definition.endpoint().is_empty() {
            return Err(Error::invalid_definition(
                "endpoint must be a non-empty string",
            ));
        }

        let mut parents = 0usize;
        for relation in definition.relations() {
            if relation.related.is_empty() || relation.local_field.is_empty() {
                return Err(Error::invalid_definition(
                    "relations require a related resource and a local field",
                ));
            }
            if relation.parent {
                if relation.kind != RelationKind::BelongsTo {
                    return Err(Error::invalid_definition(
                        "only a belongsTo relation may be marked as parent",
                    ));
                }
                if relation.local_key.is_none() {
                    return Err(Error::invalid_definition(
                        "a parent relation requires a local key",
                    ));
                }
                parents += 1;
            }
        }
        if parents > 1 {
            return Err(Error::invalid_definition(
                "at most one relation may be marked as parent",
            ));
        }

        let mut seen = Vec::new();
        for computed in definition.computed() {
            if computed.field.is_empty() {
                return Err(Error::invalid_definition(
                    "computed fields require a name",
                ));
            }
            if computed.field == definition.id_attribute() {
                return Err(Error::invalid_definition(
                    "a computed field may not shadow the id attribute",
                ));
            }
            if computed.deps.is_empty() {
                return Err(Error::invalid_definition(format!(
                    "computed field {} declares no dependencies",
                    computed.field
                )));
            }
            if computed.deps.contains(&computed.field) {
                return Err(Error::invalid_definition(format!(
                    "computed field {} depends on itself",
                    computed.field
                )));
            }
            if seen.contains(&computed.field.as_str()) {
                return Err(Error::invalid_definition(format!(
                    "computed field {} declared twice",
                    computed.field
                )));
            }
            seen.push(computed.field.as_str());
        }

        Ok(())
    }

    fn resolve_parent(definition: &ResourceDefinition) -> Option<ParentLink> {
        definition.relations().iter().find(|r| r.parent).map(|r| ParentLink {
            resource: r.related.clone(),
            key_field: r.local_key.clone().unwrap_or_default(),
        })
    }
}
