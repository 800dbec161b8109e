//! Opaque per-request context threaded through every hook of one call.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request context object.
///
/// Exactly one `Meta` instance exists per logical request; cloning yields
/// another handle to the same shared state, so a value written by
/// `modify_request` is visible to `get_response` and `handle_error` for
/// the same call. The pipeline creates one when the caller did not supply
/// one.
#[derive(Clone, Default)]
pub struct Meta {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl Meta {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().insert(key.into(), value.into());
    }

    /// Read a value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Whether any entries have been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Whether this handle and `other` refer to the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Meta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meta")
            .field("entries", &self.inner.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let meta = Meta::new();
        let handle = meta.clone();
        handle.insert("attempt", 1);

        assert_eq!(meta.get("attempt"), Some(Value::from(1)));
        assert!(meta.same_instance(&handle));
    }

    #[test]
    fn fresh_instances_are_distinct() {
        let a = Meta::new();
        let b = Meta::new();
        assert!(!a.same_instance(&b));
        assert!(a.is_empty());
    }
}
