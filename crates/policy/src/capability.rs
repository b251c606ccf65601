use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a capability comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// General-purpose library (data formats, text processing).
    Standard,
    /// Host integration (network, HTML, logging, scraping helpers).
    Extra,
}

/// Built-in capability names.
pub mod names {
    pub const JSON: &str = "json";
    pub const REGEX: &str = "regex";
    pub const LOG: &str = "log";
    pub const HTTP: &str = "http";
    pub const HTML: &str = "html";
    pub const TIMES: &str = "times";
    pub const UTIL: &str = "util";
}

/// A named set of host functions a rule may import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub kind: CapabilityKind,
    pub functions: Vec<String>,
}

impl Capability {
    pub fn new(name: impl Into<String>, kind: CapabilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            functions: Vec::new(),
        }
    }

    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::Standard)
    }

    pub fn extra(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::Extra)
    }

    pub fn with_functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = functions.into_iter().map(Into::into).collect();
        self
    }

    pub fn exports(&self, function: &str) -> bool {
        self.functions.iter().any(|f| f == function)
    }
}

/// Mapping from capability name to its exported function set.
///
/// The registry is the allow-set for imports: a name that is not registered
/// is never bound into a rule, whatever the policy says.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    /// A registry with no capabilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The capabilities shipped with quarry.
    pub fn builtin() -> Self {
        Self::empty()
            .with(Capability::standard(names::JSON).with_functions(["parse", "stringify"]))
            .with(
                Capability::standard(names::REGEX)
                    .with_functions(["is_match", "find", "find_all", "replace"]),
            )
            .with(Capability::standard(names::TIMES).with_functions(["now", "parse", "format"]))
            .with(Capability::extra(names::LOG).with_functions(["debug", "info", "warn", "error"]))
            .with(Capability::extra(names::HTTP).with_functions(["get", "post"]))
            .with(Capability::extra(names::HTML).with_functions([
                "parse",
                "serialize",
                "query",
                "query_all",
                "query_text",
                "attr",
                "text",
            ]))
            .with(Capability::extra(names::UTIL).with_functions([
                "title_clean",
                "slugify",
                "chapter_number",
                "absolute_url",
                "is_chapter_url",
                "filter_chapter_links",
                "sort_chapters",
            ]))
    }

    /// Add or replace a capability.
    pub fn register(&mut self, capability: Capability) {
        self.entries.insert(capability.name.clone(), capability);
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.register(capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
