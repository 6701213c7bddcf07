/*!
The value tree carried by the codec.

A document is always a [`Mapping`] at the top level. Containers own their
children outright, so a tree never contains shared or cyclic nodes.
*/

use std::fmt;

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::{Result, SnapwireError};

/// Text-keyed mapping. Iteration follows insertion order, which keeps the
/// encoded bytes stable; equality ignores order.
pub type Mapping = IndexMap<String, Value>;

/// A node of the value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Arbitrary-precision integer
    Integer(BigInt),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Nested mapping (container)
    Mapping(Mapping),
    /// Ordered list (container)
    Sequence(Vec<Value>),
}

/// Stable runtime type tag of a [`Value`], used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
    Mapping,
    Sequence,
}

impl ValueKind {
    /// All kinds the codec knows how to handle.
    pub const ALL: [ValueKind; 5] = [
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::Text,
        ValueKind::Mapping,
        ValueKind::Sequence,
    ];

    /// Containers recursively embed other encoded values.
    pub fn is_container(self) -> bool {
        matches!(self, ValueKind::Mapping | ValueKind::Sequence)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Mapping => "mapping",
            ValueKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Mapping(_) => ValueKind::Mapping,
            Value::Sequence(_) => ValueKind::Sequence,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(BigInt::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Mapping> for Value {
    fn from(v: Mapping) -> Self {
        Value::Mapping(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Sequence(v)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = SnapwireError;

    /// JSON has no counterpart for null and booleans here; both are rejected.
    fn try_from(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Err(SnapwireError::validation(
                "null has no snapwire representation",
            )),
            serde_json::Value::Bool(b) => Err(SnapwireError::validation(format!(
                "boolean {b} has no snapwire representation"
            ))),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::from(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::from(u))
                } else {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| SnapwireError::validation(format!("unsupported number {n}")))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            serde_json::Value::Object(map) => mapping_from_json(map).map(Value::Mapping),
        }
    }
}

/// Convert a JSON object into a document mapping.
pub fn mapping_from_json(map: serde_json::Map<String, serde_json::Value>) -> Result<Mapping> {
    map.into_iter()
        .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
        .collect()
}

impl TryFrom<&Value> for serde_json::Value {
    type Error = SnapwireError;

    /// Integers outside the i64/u64 range and non-finite floats cannot be
    /// expressed in JSON.
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => {
                if let Ok(v) = i64::try_from(i) {
                    Ok(serde_json::Value::from(v))
                } else if let Ok(v) = u64::try_from(i) {
                    Ok(serde_json::Value::from(v))
                } else {
                    Ok(serde_json::Value::String(i.to_string()))
                }
            }
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| SnapwireError::validation(format!("float {f} is not valid JSON"))),
            Value::Text(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Mapping(m) => mapping_to_json(m),
            Value::Sequence(items) => items
                .iter()
                .map(serde_json::Value::try_from)
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
        }
    }
}

/// Convert a document mapping into a JSON object.
pub fn mapping_to_json(mapping: &Mapping) -> Result<serde_json::Value> {
    let mut out = serde_json::Map::with_capacity(mapping.len());
    for (key, value) in mapping {
        out.insert(key.clone(), serde_json::Value::try_from(value)?);
    }
    Ok(serde_json::Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_container_flag() {
        assert_eq!(Value::from(1).kind(), ValueKind::Integer);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::from("x").kind(), ValueKind::Text);
        assert_eq!(Value::from(Mapping::new()).kind(), ValueKind::Mapping);
        assert_eq!(Value::from(Vec::<Value>::new()).kind(), ValueKind::Sequence);

        let containers: Vec<_> = ValueKind::ALL
            .iter()
            .filter(|k| k.is_container())
            .collect();
        assert_eq!(containers, vec![&ValueKind::Mapping, &ValueKind::Sequence]);
    }

    #[test]
    fn test_mapping_equality_ignores_order() {
        let a: Mapping = [("a".to_string(), Value::from(1)), ("b".to_string(), Value::from(2))]
            .into_iter()
            .collect();
        let b: Mapping = [("b".to_string(), Value::from(2)), ("a".to_string(), Value::from(1))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({
            "a": 1,
            "b": {"c": "x"},
            "list": [1, "two", 3.5],
            "big": 18446744073709551615u64
        });
        let value = Value::try_from(json.clone()).unwrap();
        let mapping = value.as_mapping().unwrap();
        assert_eq!(mapping["a"], Value::from(1));
        assert_eq!(mapping["list"].as_sequence().unwrap()[2], Value::Float(3.5));
        assert_eq!(mapping["big"], Value::from(u64::MAX));

        let back = serde_json::Value::try_from(&value).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_json_rejects_null_and_bool() {
        assert!(Value::try_from(serde_json::json!(null)).is_err());
        assert!(Value::try_from(serde_json::json!({"flag": true})).is_err());
    }

    #[test]
    fn test_huge_integer_to_json_is_text() {
        let huge: BigInt = "123456789012345678901234567890".parse().unwrap();
        let json = serde_json::Value::try_from(&Value::Integer(huge)).unwrap();
        assert_eq!(json, serde_json::json!("123456789012345678901234567890"));
    }
}
