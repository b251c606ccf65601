//! Typed values exchanged between the host and rule scripts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A key-sorted mapping of names to values.
pub type Record = BTreeMap<String, Value>;

/// A semantically typed value.
///
/// Environments handed to rules and results produced by rules are both
/// expressed as `Value`, so shape checks narrow an explicit variant instead
/// of probing engine objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Name of the variant, used in shape error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Record(_) => "record",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this value is a record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|r| r.get(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Record(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_each_variant_from_json() {
        let v: Value = serde_json::from_str(
            r#"{"a": null, "b": true, "c": 3, "d": 1.5, "e": "x", "f": [1], "g": {"h": 2}}"#,
        )
        .unwrap();
        assert_eq!(v.get("a"), Some(&Value::Absent));
        assert_eq!(v.get("b"), Some(&Value::Bool(true)));
        assert_eq!(v.get("c"), Some(&Value::Int(3)));
        assert_eq!(v.get("d"), Some(&Value::Float(1.5)));
        assert_eq!(v.get("e"), Some(&Value::from("x")));
        assert_eq!(v.get("f"), Some(&Value::Sequence(vec![Value::Int(1)])));
        assert_eq!(v.get("g").and_then(|g| g.get("h")), Some(&Value::Int(2)));
    }

    #[test]
    fn record_serializes_with_sorted_keys() {
        let v: Value = [("zeta", 1i64), ("alpha", 2)].into_iter().collect();
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn display_renders_scalars_plainly() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Sequence(vec![Value::Bool(false)]).to_string(), "[false]");
    }
}
