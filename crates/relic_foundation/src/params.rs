//! Filter and query parameters.

use std::fmt::Write;

use crate::record::Record;
use crate::value::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sort direction for [`Params::order_by`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Parameters for filtering a collection or shaping a query.
///
/// A record matches when every equality condition holds. `skip`/`limit`
/// window the matching sequence; `order_by` sorts it first. The same
/// params value also produces the canonical signature used to deduplicate
/// structurally-identical queries.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Params {
    conditions: Vec<(String, Value)>,
    skip: Option<usize>,
    limit: Option<usize>,
    order_by: Option<(String, SortOrder)>,
}

impl Params {
    /// Creates empty params (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition on a field.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Skips the first `n` matching records.
    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    /// Caps the number of records yielded.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sorts matches by a field before windowing.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    /// Returns the equality conditions.
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Returns the skip count, if set.
    #[must_use]
    pub const fn skip_count(&self) -> Option<usize> {
        self.skip
    }

    /// Returns the limit, if set.
    #[must_use]
    pub const fn limit_count(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the sort field and direction, if set.
    #[must_use]
    pub fn order(&self) -> Option<(&str, SortOrder)> {
        self.order_by.as_ref().map(|(f, o)| (f.as_str(), *o))
    }

    /// Returns true if no conditions or windowing are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.skip.is_none()
            && self.limit.is_none()
            && self.order_by.is_none()
    }

    /// Returns true if the record satisfies every equality condition.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }

    /// Renders the canonical signature of these params.
    ///
    /// Conditions are sorted by field name and values rendered
    /// deterministically, so structurally-identical params always produce
    /// the same signature regardless of construction order.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = String::new();
        let mut conditions: Vec<_> = self.conditions.iter().collect();
        conditions.sort_by(|(f1, _), (f2, _)| f1.cmp(f2));
        out.push_str("where{");
        for (i, (field, value)) in conditions.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{field}=");
            value.canonicalize(&mut out);
        }
        out.push('}');
        if let Some(skip) = self.skip {
            let _ = write!(out, ";skip={skip}");
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, ";limit={limit}");
        }
        if let Some((field, order)) = &self.order_by {
            let dir = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            let _ = write!(out, ";order={field}:{dir}");
        }
        out
    }

    /// Looks up the value of an equality condition by field name.
    #[must_use]
    pub fn condition(&self, field: &str) -> Option<&Value> {
        self.conditions
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v)
    }
}
