//! Conversion between host values and script values.

use bundle::{Record, Value};
use rhai::{Array, Dynamic, Map};

/// Convert a host value into a script value.
pub fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Absent => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Int(i) => Dynamic::from(*i),
        Value::Float(x) => Dynamic::from(*x),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Sequence(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
        Value::Record(record) => Dynamic::from_map(record_to_map(record)),
    }
}

pub fn record_to_map(record: &Record) -> Map {
    record
        .iter()
        .map(|(k, v)| (k.as_str().into(), to_dynamic(v)))
        .collect()
}

/// Narrow a script value into a host value.
///
/// Values with no host counterpart (HTML nodes, function pointers) are
/// rendered to their string form.
pub fn from_dynamic(value: &Dynamic) -> Value {
    if value.is_unit() {
        return Value::Absent;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Int(i);
    }
    if let Ok(x) = value.as_float() {
        return Value::Float(x);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if let Some(items) = value.read_lock::<Array>() {
        return Value::Sequence(items.iter().map(from_dynamic).collect());
    }
    if let Some(map) = value.read_lock::<Map>() {
        return Value::Record(
            map.iter()
                .map(|(k, v)| (k.to_string(), from_dynamic(v)))
                .collect(),
        );
    }
    Value::String(value.to_string())
}
