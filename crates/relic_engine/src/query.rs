//! Canonical query signatures for dedup bookkeeping.

use std::fmt::Write;

use relic_foundation::{Key, Params};

/// Renders the canonical signature of a query.
///
/// Two structurally-identical queries (same verb, resource, key, and
/// params regardless of param construction order) always render the
/// same signature, which is what keys the pending/completed bookkeeping.
#[must_use]
pub fn signature(verb: &str, resource: &str, key: Option<&Key>, params: &Params) -> String {
    let mut out = String::new();
    let _ = write!(out, "{verb}:{resource}");
    if let Some(key) = key {
        let _ = write!(out, ":{key}");
    }
    let _ = write!(out, ":{}", params.signature());
    out
}
