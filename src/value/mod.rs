//! Platform value space
//!
//! Values that can cross the function boundary:
//! - null, int64, float64, boolean, string, bytes
//! - arrays and insertion-ordered objects
//!
//! # Wire format
//!
//! JSON numbers are always float64. Values JSON cannot carry use a
//! single-key object marker:
//! - int64: `{"$integer": base64(i64 little-endian)}`
//! - bytes: `{"$bytes": base64}`
//! - non-finite float64: `{"$float": base64(f64 little-endian)}`
//!
//! Field names starting with `$` are reserved for these markers.
//!
//! # Binding Rust types
//!
//! [`to_value`] and [`from_value`] move values between Rust types and the
//! value space through serde, without the wire form:
//! - `i64` and `u64` are int64; narrower integers and floats are float64
//! - byte buffers and non-empty `u8` sequences are bytes
//! - an integral float64 binds to any Rust integer type that holds it

mod de;
mod ser;

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde_json::{json, Map, Number};
use thiserror::Error;

pub use de::from_value;
pub use ser::{to_value, ValueSerializer};

/// Result type for value import
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors raised while importing wire JSON
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("field name '{0}' is reserved")]
    ReservedField(String),

    #[error("malformed {marker} value: {reason}")]
    MalformedMarker { marker: &'static str, reason: String },

    #[error("number {0} is not representable as float64")]
    UnrepresentableNumber(String),

    /// Raised by serde while binding a Rust type
    #[error("{0}")]
    Binding(String),
}

impl serde::ser::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError::Binding(msg.to_string())
    }
}

impl serde::de::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError::Binding(msg.to_string())
    }
}

/// A value in the platform value space
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Float64(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Build an object value from `(name, value)` pairs, keeping their order
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Import a value from its JSON wire form
    pub fn from_json(json: serde_json::Value) -> ValueResult<Self> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Float64)
                .ok_or_else(|| ValueError::UnrepresentableNumber(n.to_string())),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::from_json)
                .collect::<ValueResult<Vec<_>>>()
                .map(Value::Array),
            serde_json::Value::Object(map) => Self::object_from_json(map),
        }
    }

    fn object_from_json(map: Map<String, serde_json::Value>) -> ValueResult<Self> {
        if let Some((key, inner)) = map.iter().next().filter(|_| map.len() == 1) {
            match key.as_str() {
                "$integer" => {
                    return decode_marker::<8>("$integer", inner)
                        .map(|b| Value::Int64(i64::from_le_bytes(b)));
                }
                "$float" => {
                    return decode_marker::<8>("$float", inner)
                        .map(|b| Value::Float64(f64::from_le_bytes(b)));
                }
                "$bytes" => {
                    let encoded = inner.as_str().ok_or_else(|| ValueError::MalformedMarker {
                        marker: "$bytes",
                        reason: "expected a base64 string".into(),
                    })?;
                    return STANDARD
                        .decode(encoded)
                        .map(Value::Bytes)
                        .map_err(|e| ValueError::MalformedMarker {
                            marker: "$bytes",
                            reason: e.to_string(),
                        });
                }
                _ => {}
            }
        }

        let mut fields = IndexMap::with_capacity(map.len());
        for (key, inner) in map {
            if key.starts_with('$') {
                return Err(ValueError::ReservedField(key));
            }
            fields.insert(key, Value::from_json(inner)?);
        }
        Ok(Value::Object(fields))
    }

    /// Export the value to its JSON wire form
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(n) => json!({ "$integer": STANDARD.encode(n.to_le_bytes()) }),
            Value::Float64(f) => match Number::from_f64(*f) {
                Some(n) => serde_json::Value::Number(n),
                None => json!({ "$float": STANDARD.encode(f.to_le_bytes()) }),
            },
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(bytes) => json!({ "$bytes": STANDARD.encode(bytes) }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn decode_marker<const N: usize>(
    marker: &'static str,
    inner: &serde_json::Value,
) -> ValueResult<[u8; N]> {
    let encoded = inner.as_str().ok_or_else(|| ValueError::MalformedMarker {
        marker,
        reason: "expected a base64 string".into(),
    })?;
    let bytes = STANDARD.decode(encoded).map_err(|e| ValueError::MalformedMarker {
        marker,
        reason: e.to_string(),
    })?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| ValueError::MalformedMarker {
        marker,
        reason: format!("expected {} bytes, got {}", N, bytes.len()),
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_numbers_are_float64() {
        let value = Value::from_json(json!(5)).unwrap();
        assert_eq!(value, Value::Float64(5.0));
    }

    #[test]
    fn test_int64_marker_round_trip() {
        let value = Value::Int64(-42);
        let wire = value.to_json();
        assert!(wire.get("$integer").is_some());
        assert_eq!(Value::from_json(wire).unwrap(), value);
    }

    #[test]
    fn test_bytes_marker() {
        let wire = json!({ "$bytes": "AQID" });
        assert_eq!(Value::from_json(wire).unwrap(), Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_non_finite_float_uses_marker() {
        let wire = Value::Float64(f64::INFINITY).to_json();
        assert!(wire.get("$float").is_some());
        assert_eq!(Value::from_json(wire).unwrap(), Value::Float64(f64::INFINITY));
    }

    #[test]
    fn test_reserved_field_rejected() {
        let err = Value::from_json(json!({ "$id": 1, "name": "x" })).unwrap_err();
        assert_eq!(err, ValueError::ReservedField("$id".into()));
    }

    #[test]
    fn test_malformed_integer_marker() {
        let err = Value::from_json(json!({ "$integer": "AQ==" })).unwrap_err();
        assert!(matches!(err, ValueError::MalformedMarker { marker: "$integer", .. }));
    }

    #[test]
    fn test_object_order_preserved() {
        let value = Value::from_json(json!({ "b": 1, "a": 2 })).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }
}
