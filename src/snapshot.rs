//! Opaque snapshot values received from the instrumented app.
//!
//! A [`Snapshot`] is never given a concrete structural type: payload shapes
//! drift between app versions, so everything outside the normalizer treats it
//! as an immutable JSON value plus the accessors below.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key the flat debug shape uses for its capture time.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One immutable record of application state.
///
/// Cloning is cheap and clones share the same underlying value, so identity
/// can be checked with [`Snapshot::ptr_eq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Arc<Value>);

impl Snapshot {
    /// Wraps a decoded payload verbatim.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// The raw payload.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Returns true when both handles point at the same appended snapshot.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Looks up a top-level key; `None` for non-object payloads.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|map| map.get(key))
    }

    /// True when the payload is a key/value object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// The payload's `timestamp` field, if it carries one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&Value> {
        self.get(TIMESTAMP_KEY)
    }

    /// Top-level keys in payload order; empty for non-object payloads.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.as_object().into_iter().flat_map(|map| map.keys().map(String::as_str))
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
