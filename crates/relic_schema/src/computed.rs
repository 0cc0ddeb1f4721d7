//! Computed field declarations.

use std::fmt;
use std::sync::Arc;

use relic_foundation::{Record, Result, Value};

/// Derivation function for a computed field.
///
/// Receives the dependency values in declared order. A failed derivation
/// propagates to the digest caller and aborts the remainder of that
/// digest pass.
pub type DeriveFn = Arc<dyn Fn(&[Value]) -> Result<Value>>;

/// A computed field: a fixed dependency list plus a pure derivation.
///
/// The dependency list is fixed at registration time. The field is
/// recomputed only when at least one dependency's value differs from the
/// snapshot taken at the end of the previous digest.
#[derive(Clone)]
pub struct ComputedDef {
    /// Name of the derived field.
    pub field: String,
    /// Dependency field names, in the order the derivation receives them.
    pub deps: Vec<String>,
    derive: DeriveFn,
}

impl ComputedDef {
    /// Declares a computed field.
    pub fn new<F>(
        field: impl Into<String>,
        deps: impl IntoIterator<Item = impl Into<String>>,
        derive: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Self {
            field: field.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            derive: Arc::new(derive),
        }
    }

    /// Collects the current dependency values from a record, in declared
    /// order. Absent fields read as [`Value::Null`].
    #[must_use]
    pub fn dep_values(&self, record: &Record) -> Vec<Value> {
        self.deps
            .iter()
            .map(|dep| record.get(dep).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Invokes the derivation with already-collected dependency values.
    pub fn evaluate_with(&self, deps: &[Value]) -> Result<Value> {
        (self.derive)(deps)
    }

    /// Collects dependencies from the record and derives the field value.
    pub fn evaluate(&self, record: &Record) -> Result<Value> {
        self.evaluate_with(&self.dep_values(record))
    }
}

impl fmt::Debug for ComputedDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedDef")
            .field("field", &self.field)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}
