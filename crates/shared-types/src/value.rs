//! Dynamic JSON-shaped values for payload maps.
//!
//! The built-in state carries `public` and `private` maps of heterogeneous
//! JSON data. Those maps are encrypted into the token, and the compact
//! binary token encoding is not self-describing, so `serde_json::Value`
//! (which requires `deserialize_any`) cannot be used there. [`Value`] is a
//! tagged enum instead: total in both encodings, with lossless conversions
//! to and from `serde_json::Value` at the wire boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dynamic value: null, bool, number, string, array, or object.
///
/// Numbers are `f64`, matching the wire semantics of untyped JSON numbers.
/// Objects use a `BTreeMap` so serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Arr(Vec<Value>),
    Obj(BTreeMap<String, Value>),
}

impl Value {
    /// True if this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Arr(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Obj(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Arr(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Obj(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a JSON object into a payload map. Non-object input yields an
/// empty map.
#[must_use]
pub fn map_from_json(v: serde_json::Value) -> BTreeMap<String, Value> {
    match v {
        serde_json::Value::Object(entries) => entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Convert a payload map back into a JSON object for the public wire.
#[must_use]
pub fn map_to_json(map: &BTreeMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
            .collect(),
    )
}
