//! Resource definitions and the schema registry for relic.
//!
//! This crate provides:
//! - [`ResourceDefinition`] - Per-resource schema: key attribute, endpoint,
//!   relations, computed fields, hooks, and methods
//! - [`RelationDef`] - hasOne/hasMany/belongsTo relation declarations
//! - [`ComputedDef`] - Computed fields with explicit dependency lists
//! - [`HookSet`] - Lifecycle hook table with default/override merging
//! - [`Registry`] - Name-unique definition registry with hierarchical
//!   endpoint resolution

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod computed;
mod definition;
mod hooks;
mod registry;
mod relation;

pub use computed::{ComputedDef, DeriveFn};
pub use definition::{FilterFn, Method, ParentLink, ResourceDefinition};
pub use hooks::{EngineDefaults, Hook, HookSet, HookStage};
pub use registry::{EndpointOptions, KeyLookup, Registry};
pub use relation::{RelationDef, RelationKind};
