//! Rule definitions and bundle metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named script fragments that rules may inline with `fn:<key>` imports.
pub type FunctionTable = BTreeMap<String, String>;

/// Well-known rule identifiers.
pub mod ids {
    pub const SEARCH: &str = "search";
    pub const ITEM_INFO: &str = "item-info";
    pub const CHAPTER_LIST: &str = "chapter-list";
    pub const CONTENT: &str = "content";
}

/// A single rule: the imports it requests and the script body it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Import declarations in the order they were written.
    #[serde(default)]
    pub imports: Vec<String>,

    /// Script body.
    pub code: String,
}

impl RuleDefinition {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            imports: Vec::new(),
            code: code.into(),
        }
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }
}

/// Descriptive header of a rule bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub language: String,
    /// Base URLs of the sites the bundle scrapes.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub identifier: String,
}
