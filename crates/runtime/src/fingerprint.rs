//! Canonical fingerprints of invocation inputs.

use std::fmt;

use bundle::Value;
use sha2::{Digest, Sha256};

/// SHA-256 of the canonical JSON form of a value.
///
/// Records are key-sorted and floats use a fixed shortest-roundtrip format,
/// so two inputs with the same pairs in a different order fingerprint alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(value: &Value) -> Self {
        let canonical = serde_json::to_vec(value).unwrap_or_else(|_| value.to_string().into_bytes());
        Self(format!("{:x}", Sha256::digest(&canonical)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle::Record;

    fn record(pairs: &[(&str, Value)]) -> Value {
        Value::Record(pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect::<Record>())
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = record(&[("query", "dune".into()), ("page", Value::Int(1))]);
        let b = record(&[("page", Value::Int(1)), ("query", "dune".into())]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn different_values_differ() {
        let a = record(&[("page", Value::Int(1))]);
        let b = record(&[("page", Value::Int(2))]);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn int_and_float_are_distinct() {
        let a = record(&[("n", Value::Int(1))]);
        let b = record(&[("n", Value::Float(1.0))]);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let fingerprint = Fingerprint::of(&Value::Absent);
        assert_eq!(fingerprint.as_str().len(), 64);
        assert_eq!(fingerprint.to_string().len(), 12);
    }
}
