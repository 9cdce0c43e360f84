//! Partial creation queries.
//!
//! Each step owns a slice of the poll-creation request, keyed by field name.
//! [`SharedQuery`] is a handle to one such live object: cloning the handle
//! does not copy the data, so the step form that received it from the
//! controller and the controller itself see the same edits.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// A field-name to value mapping.
pub type Query = serde_json::Map<String, Value>;

/// A shared, mutable query object.
#[derive(Clone, Default)]
pub struct SharedQuery {
    inner: Arc<RwLock<Query>>,
}

impl SharedQuery {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query holding `values`.
    pub fn from_map(values: Query) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    /// Get a copy of a field value.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner.read().get(field).cloned()
    }

    /// Check whether a field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.inner.read().contains_key(field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(field.into(), value)
    }

    /// Remove a field, returning its value.
    pub fn remove(&self, field: &str) -> Option<Value> {
        self.inner.write().remove(field)
    }

    /// Remove every field.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check whether no field is present.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Field names currently present, in key order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Deep copy of the current contents.
    pub fn snapshot(&self) -> Query {
        self.inner.read().clone()
    }

    /// Read the query through a closure without copying it.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Query) -> R,
    {
        f(&self.inner.read())
    }

    /// Check whether two handles point at the same live object.
    pub fn ptr_eq(&self, other: &SharedQuery) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedQuery").field(&*self.inner.read()).finish()
    }
}

impl From<Query> for SharedQuery {
    fn from(values: Query) -> Self {
        Self::from_map(values)
    }
}
