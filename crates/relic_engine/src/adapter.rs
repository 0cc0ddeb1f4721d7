//! The adapter boundary: the I/O contract this engine depends on.

use relic_foundation::{Key, Params, Record, Result, Value};

/// The out-of-scope I/O layer, seen from the engine.
///
/// Implementations perform the actual network (or other) I/O and return
/// raw data for the store to decompose and inject. Errors pass through
/// opaquely as `ErrorKind::Adapter`; the engine leaves store state
/// untouched when an adapter call fails, and never retries; retry policy
/// belongs to the adapter.
pub trait Adapter {
    /// Persists new attributes; returns the created raw record (or
    /// [`Value::Null`] for echo-nothing backends).
    fn create(&self, resource: &str, attrs: &Record) -> Result<Value>;

    /// Persists updated attributes for a keyed record; returns the
    /// updated raw record (or [`Value::Null`]).
    fn update(&self, resource: &str, key: &Key, attrs: &Record) -> Result<Value>;

    /// Deletes the keyed record remotely.
    fn destroy(&self, resource: &str, key: &Key) -> Result<()>;

    /// Fetches one raw record by key.
    fn find(&self, resource: &str, key: &Key, params: &Params) -> Result<Value>;

    /// Fetches a list of raw records.
    fn find_all(&self, resource: &str, params: &Params) -> Result<Value>;
}
