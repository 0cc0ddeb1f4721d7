//! Core types for the relic resource store.
//!
//! This crate provides:
//! - [`Value`] - The dynamic field value type for all record data
//! - [`Record`] - A persistent field-name → value mapping
//! - [`Key`] - Primary-key values extracted from records
//! - [`Error`] - Rich error types with context
//! - [`Params`] - Filter/query parameters with canonical signatures
//! - [`ChangeEvent`] - Observer notification payloads

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod event;
mod key;
mod params;
mod record;
mod value;

pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use event::{ChangeEvent, ChangeKind, ObserverFn, ObserverId};
pub use key::Key;
pub use params::{Params, SortOrder};
pub use record::Record;
pub use value::{RecordRef, Value};
