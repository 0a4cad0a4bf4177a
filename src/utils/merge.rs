//! Recursive merging of JSON values
//!
//! Used by [`SharedState::merge`](crate::utils::SharedState::merge) to fold
//! command results into the state shared across a command tree.

use serde_json::Value;

/// Merge `incoming` into `current` and return the result.
///
/// - `null` on either side yields the other side
/// - objects merge key by key, recursively
/// - arrays concatenate, dropping values already present (first position wins)
/// - anything else takes the incoming value
pub fn recursive_merge(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Null, incoming) => incoming,
        (current, Value::Null) => current,
        (Value::Object(mut current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let existing = current.remove(&key).unwrap_or(Value::Null);
                current.insert(key, recursive_merge(existing, value));
            }
            Value::Object(current)
        }
        (Value::Array(current), Value::Array(incoming)) => {
            let mut merged: Vec<Value> = Vec::with_capacity(current.len() + incoming.len());
            for value in current.into_iter().chain(incoming) {
                if !merged.contains(&value) {
                    merged.push(value);
                }
            }
            Value::Array(merged)
        }
        (_, incoming) => incoming,
    }
}
