//! Rule bundle parsing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, FunctionTable, Metadata, Record, Result, RuleDefinition};

/// Everything a rule bundle file provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBundle {
    #[serde(default)]
    pub metadata: Metadata,

    /// Initial persistent environment.
    #[serde(default)]
    pub env: Record,

    #[serde(default)]
    pub rules: BTreeMap<String, RuleDefinition>,

    #[serde(default)]
    pub functions: FunctionTable,
}

impl RuleBundle {
    /// Load a bundle, picking the format from the file extension
    /// (`.yaml`/`.yml` or `.toml`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let bundle = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content)?,
            Some("toml") => Self::from_toml(&content)?,
            _ => {
                return Err(Error::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        tracing::debug!(
            path = %path.display(),
            rules = bundle.rules.len(),
            functions = bundle.functions.len(),
            "bundle loaded"
        );
        Ok(bundle)
    }

    /// Parse a bundle from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Parse a bundle from TOML.
    pub fn from_toml(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    pub fn rule(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.get(id)
    }
}
