//! Records: persistent field-name → value mappings.

use std::fmt;

use crate::key::Key;
use crate::value::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A record: a mapping of field name → value.
///
/// Backed by a persistent map, so cloning is O(1) and the bookkeeping
/// snapshots a store keeps (saved, previous attributes) share structure
/// with the live record instead of copying it.
#[derive(Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    fields: im::HashMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a record with the field set, builder-style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field value, returning the previous value if any.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value if present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Extracts this record's primary key via the given id attribute.
    ///
    /// Returns `None` if the attribute is absent or not a keyable value.
    #[must_use]
    pub fn key(&self, id_attribute: &str) -> Option<Key> {
        self.get(id_attribute).and_then(Key::from_value)
    }

    /// Returns this record merged with `newer`: fields present in `newer`
    /// overwrite, fields absent in `newer` are retained.
    #[must_use]
    pub fn merged(&self, newer: &Self) -> Self {
        let mut fields = self.fields.clone();
        for (k, v) in newer.iter() {
            fields.insert(k.clone(), v.clone());
        }
        Self { fields }
    }

    /// Returns the fields of `self` that differ from `base`, with `self`'s
    /// values: the shape used for change detection against a snapshot.
    ///
    /// Fields present only in `base` (removed fields) are reported as
    /// [`Value::Null`].
    #[must_use]
    pub fn diff(&self, base: &Self) -> Self {
        let mut out = Self::new();
        for (field, value) in self.iter() {
            if base.get(field) != Some(value) {
                out.set(field.clone(), value.clone());
            }
        }
        for (field, _) in base.iter() {
            if !self.contains(field) {
                out.set(field.clone(), Value::Null);
            }
        }
        out
    }

    /// Builds a record from a [`Value::Map`]; `None` for other variants.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_map().map(|m| Self { fields: m.clone() })
    }

    /// Converts this record into a [`Value::Map`].
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Map(self.fields)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.fields.iter().collect();
        entries.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
        f.debug_map().entries(entries).finish()
    }
}

impl From<im::HashMap<String, Value>> for Record {
    fn from(fields: im::HashMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
