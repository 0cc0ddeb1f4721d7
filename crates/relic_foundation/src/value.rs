//! Dynamic field value type for all record data.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::key::Key;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A dynamic record field value.
///
/// Values are cheap to clone: composite variants use persistent data
/// structures with structural sharing, strings are reference-counted.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    Str(Arc<str>),
    /// Ordered sequence of values.
    List(im::Vector<Value>),
    /// Nested field map.
    Map(im::HashMap<String, Value>),
    /// Non-owning reference to a record in another resource's store.
    Ref(RecordRef),
}

/// A non-owning cross-resource record reference.
///
/// Relation fields on stored records hold these instead of copies: the
/// owning store keeps the canonical record, and the reference is resolved
/// on access. This keeps ejection well-defined and avoids true cycles
/// between parent and child records.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordRef {
    /// Name of the resource that owns the referenced record.
    pub resource: Arc<str>,
    /// Primary key of the referenced record.
    pub key: Key,
}

impl RecordRef {
    /// Creates a reference to the record with `key` in `resource`.
    #[must_use]
    pub fn new(resource: impl Into<Arc<str>>, key: Key) -> Self {
        Self {
            resource: resource.into(),
            key,
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.key)
    }
}

impl Value {
    /// Returns a short name for the variant, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Ref(_) => "ref",
        }
    }

    /// Returns true if this value is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a list.
    #[must_use]
    pub const fn as_list(&self) -> Option<&im::Vector<Value>> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to extract a nested map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&im::HashMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Attempts to extract a record reference.
    #[must_use]
    pub const fn as_ref_value(&self) -> Option<&RecordRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Compares two values under a deterministic total order.
    ///
    /// Values of different variants order by variant rank; floats use
    /// their IEEE total ordering so `NaN` has a stable position. Maps
    /// compare by length, then by sorted key/value pairs.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Map(a), Self::Map(b)) => {
                let ord = a.len().cmp(&b.len());
                if ord != Ordering::Equal {
                    return ord;
                }
                let mut left: Vec<_> = a.iter().collect();
                let mut right: Vec<_> = b.iter().collect();
                left.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
                right.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
                for ((ka, va), (kb, vb)) in left.into_iter().zip(right) {
                    let ord = ka.cmp(kb).then_with(|| va.compare(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            }
            (Self::Ref(a), Self::Ref(b)) => {
                a.resource.cmp(&b.resource).then_with(|| a.key.cmp(&b.key))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Writes a deterministic textual rendering of this value.
    ///
    /// Map keys are sorted, so two equal values always render identically.
    /// Used to build canonical query signatures.
    pub fn canonicalize(&self, out: &mut String) {
        use fmt::Write;
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Self::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Self::Float(f) => {
                let _ = write!(out, "{f:?}");
            }
            Self::Str(s) => {
                let _ = write!(out, "{s:?}");
            }
            Self::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.canonicalize(out);
                }
                out.push(']');
            }
            Self::Map(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
                out.push('{');
                for (i, (k, v)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{k}:");
                    v.canonicalize(out);
                }
                out.push('}');
            }
            Self::Ref(r) => {
                let _ = write!(out, "{r}");
            }
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Str(_) => 4,
            Self::List(_) => 5,
            Self::Map(_) => 6,
            Self::Ref(_) => 7,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s.as_str()))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(i) => Self::Int(i),
            Key::Str(s) => Self::Str(s),
        }
    }
}

impl From<RecordRef> for Value {
    fn from(r: RecordRef) -> Self {
        Self::Ref(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items.into_iter().collect())
    }
}

impl From<im::Vector<Value>> for Value {
    fn from(items: im::Vector<Value>) -> Self {
        Self::List(items)
    }
}

impl From<im::HashMap<String, Value>> for Value {
    fn from(map: im::HashMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}
