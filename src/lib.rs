//! relic - Relation-aware in-memory resource store
//!
//! This crate re-exports all layers of the relic system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: relic_engine     — Lifecycle pipeline, adapter boundary, query dedup
//! Layer 2: relic_storage    — Cache/index, entity stores, relation linking, digest
//! Layer 1: relic_schema     — Resource definitions, relations, hooks, registry
//! Layer 0: relic_foundation — Core types (Value, Record, Key, Error)
//! ```

pub use relic_engine as engine;
pub use relic_foundation as foundation;
pub use relic_schema as schema;
pub use relic_storage as storage;
