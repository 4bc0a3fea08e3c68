//! Per-node sparse property storage with cross-thread read access

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::{PropertyKey, PropertyValue};

/// Sparse map from property identity to current value.
///
/// Absence of a key means "default value in effect", never an error. The
/// store is owned exclusively by its node; every mutation goes through the
/// node's `try_set` choke point on the UI thread. Reads are safe from any
/// thread via [`PropertyReader`], which is why the map sits behind a lock
/// rather than a plain `RefCell`.
///
/// Invariant: a value present in the store has already passed the owning
/// descriptor's `changing` veto and the equality short circuit.
#[derive(Debug, Default)]
pub struct PropertyStore {
    values: Arc<RwLock<FxHashMap<PropertyKey, PropertyValue>>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, or `None` when the default is in effect.
    pub fn get(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
    }

    pub fn contains(&self, key: PropertyKey) -> bool {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&key)
    }

    /// Commits a value. Only the owning node's `try_set` path calls this.
    pub fn insert(&self, key: PropertyKey, value: PropertyValue) {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, value);
    }

    /// Clears a value so the default is back in effect. Returns the value
    /// that was removed, if any.
    pub fn remove(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&key)
    }

    /// Returns a cloneable handle for reading properties from any thread.
    pub fn reader(&self) -> PropertyReader {
        PropertyReader {
            values: Arc::clone(&self.values),
        }
    }
}

/// Read-only, thread-safe view of a node's property store.
///
/// Background work holds one of these to observe state without marshalling
/// onto the UI thread. It never exposes mutation.
#[derive(Clone, Debug)]
pub struct PropertyReader {
    values: Arc<RwLock<FxHashMap<PropertyKey, PropertyValue>>>,
}

impl PropertyReader {
    pub fn get(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
    }

    pub fn contains(&self, key: PropertyKey) -> bool {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&key)
    }
}
