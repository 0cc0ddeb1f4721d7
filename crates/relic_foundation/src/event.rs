//! Change notification payloads for store observers.

use std::sync::Arc;

use crate::key::Key;

/// What happened to an observed record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The record was first stored.
    Injected,
    /// An existing record's attributes changed.
    Updated,
    /// The record was removed from its store.
    Ejected,
    /// A computed field was recomputed during a digest; carries the field
    /// name.
    Computed(String),
}

/// A change delivered synchronously to registered observers.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// Resource the record belongs to.
    pub resource: Arc<str>,
    /// Key of the affected record.
    pub key: Key,
    /// What changed.
    pub kind: ChangeKind,
}

/// Handle returned by observer registration, used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(
    /// Monotonic registration number.
    pub u64,
);

/// Observer callback. Receives the event only; observers cannot reach
/// back into the store mid-operation.
pub type ObserverFn = Arc<dyn Fn(&ChangeEvent)>;
