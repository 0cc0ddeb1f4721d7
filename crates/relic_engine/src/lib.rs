//! Engine layer for relic: the lifecycle pipeline around the adapter
//! boundary, read-side query dedup, and relation loading.
//!
//! This crate provides:
//! - [`Adapter`] - The I/O contract the engine depends on (the network
//!   layer itself lives outside this system)
//! - [`Engine`] - Store + adapter facade: create/update/save/destroy,
//!   find/findAll with query dedup, loadRelations, digest
//! - [`ResourceHandle`] - Name-bound forwarding wrapper over the engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod adapter;
mod engine;
mod lifecycle;
mod query;

pub use adapter::Adapter;
pub use engine::{Engine, FindOptions, ResourceHandle, SaveOptions};
pub use query::signature;
