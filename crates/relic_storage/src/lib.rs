//! Storage layer for relic: cache/index, entity stores, relation linking,
//! and the digest cycle.
//!
//! This crate provides:
//! - [`Cache`] - Per-resource keyed record storage with optional expiry
//! - [`ResourceStore`] - Collection, index, and bookkeeping maps for one
//!   resource
//! - [`Store`] - The facade: registration, inject/eject/get/filter,
//!   observers, and `digest()`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cache;
mod link;
mod resource;
mod store;

pub use cache::{Cache, CacheConfig, Clock, DeleteOnExpire, ExpireFn, ManualClock, SystemClock};
pub use resource::ResourceStore;
pub use store::{Related, Store};
