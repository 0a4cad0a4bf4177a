//! State shared by every node of a command tree

use super::merge::recursive_merge;
use serde_json::{Map, Value};
use std::{cell::RefCell, fmt, rc::Rc};

/// Handle to a mutable JSON object shared across a subtree.
///
/// Cloning the handle shares the underlying map; it is never copied. Nodes
/// created under a parent receive a clone of the parent's handle.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Rc<RefCell<Map<String, Value>>>,
}

impl SharedState {
    /// Create an empty shared state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the value stored under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().get(key).cloned()
    }

    /// Store `value` under `key`, returning the previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.borrow_mut().insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().contains_key(key)
    }

    /// Recursively merge `other` into the state in place.
    ///
    /// Non-object values are ignored; the state itself is always an object.
    pub fn merge(&self, other: impl Into<Value>) {
        let Value::Object(other) = other.into() else {
            return;
        };
        let mut state = self.inner.borrow_mut();
        let current = std::mem::take(&mut *state);
        if let Value::Object(merged) = recursive_merge(Value::Object(current), Value::Object(other))
        {
            *state = merged;
        }
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.borrow().clone()
    }

    /// Whether both handles point at the same state
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Map<String, Value>> for SharedState {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(map)),
        }
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedState").field(&*self.inner.borrow()).finish()
    }
}
