//! Policy configuration and enforcement.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CapabilityRegistry, Error, Result, names};

/// Capability policy loaded from TOML.
///
/// The registry decides which names exist; the policy decides which of them
/// rules may not have. Denial always wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Capabilities that are never bound, even when requested.
    #[serde(default)]
    pub deny: BTreeSet<String>,
}

/// Result of checking a single capability name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
    Unrecognized,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Allow every registered capability.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Deny network access; everything else registered is allowed.
    pub fn offline() -> Self {
        Self::default().with_deny([names::HTTP])
    }

    pub fn with_deny<I, S>(mut self, denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny.extend(denied.into_iter().map(Into::into));
        self
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.deny.contains(name)
    }

    /// Check whether a capability may be bound into a rule.
    pub fn check(&self, registry: &CapabilityRegistry, name: &str) -> Decision {
        // Explicit denials first
        if self.is_denied(name) {
            return Decision::Deny {
                reason: format!("{name} is denied by policy"),
            };
        }

        if registry.contains(name) {
            Decision::Allow
        } else {
            Decision::Unrecognized
        }
    }
}
