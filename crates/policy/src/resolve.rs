//! Import resolution and preamble synthesis.
//!
//! A rule's imports are resolved in declaration order against the function
//! table, the policy and the capability registry. Accepted imports become
//! preamble statements; rejected ones become [`ImportIssue`]s. A bad import
//! never fails the resolution as a whole.

use std::fmt;
use std::fmt::Write as _;

use bundle::{FunctionTable, RuleDefinition};

use crate::{CapabilityRegistry, Decision, Policy};

/// Prefix marking a function-snippet import.
pub const FUNCTION_PREFIX: &str = "fn:";

/// A parsed import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    /// `fn:<key>`: inline a snippet from the function table.
    ///
    /// The snippet is bound as a closure value named by
    /// [`function_identifier`], so rules invoke it as `fn_key.call(args)`.
    /// A plain `fn_key(args)` looks for a script function of that name and
    /// fails when the rule runs.
    Function(String),
    /// A bare capability name.
    Capability(String),
}

impl Import {
    /// Parse a raw import string.
    pub fn parse(raw: &str) -> Result<Self, ImportIssue> {
        let trimmed = raw.trim();
        let malformed = || ImportIssue::Malformed {
            raw: raw.to_string(),
        };

        if trimmed.is_empty() {
            return Err(malformed());
        }
        match trimmed.strip_prefix(FUNCTION_PREFIX) {
            Some(key) if key.trim().is_empty() => Err(malformed()),
            Some(key) => Ok(Import::Function(key.trim().to_string())),
            None => Ok(Import::Capability(trimmed.to_string())),
        }
    }
}

/// Identifier a snippet is bound to inside the script: `parseDate` becomes
/// `fn_parseDate`, `text.clean` becomes `fn_text_clean`. Call it with
/// `.call(...)`.
pub fn function_identifier(key: &str) -> String {
    format!("fn_{}", key.replace('.', "_"))
}

/// A skipped import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportIssue {
    Denied { name: String },
    Unrecognized { name: String },
    FunctionNotFound { key: String },
    Malformed { raw: String },
    Duplicate { name: String },
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied { name } => write!(f, "import '{name}' denied by policy"),
            Self::Unrecognized { name } => write!(f, "unrecognized import '{name}'"),
            Self::FunctionNotFound { key } => write!(f, "function '{key}' not found"),
            Self::Malformed { raw } => write!(f, "malformed import '{raw}'"),
            Self::Duplicate { name } => write!(f, "import '{name}' declared more than once"),
        }
    }
}

/// Outcome of resolving one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Script source to place before the rule body.
    pub preamble: String,
    /// Capabilities the rule may use, in declaration order.
    pub allowed: Vec<String>,
    /// Imports that were skipped, in declaration order.
    pub issues: Vec<ImportIssue>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Resolves rule imports against a registry and a policy.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a CapabilityRegistry,
    policy: &'a Policy,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a CapabilityRegistry, policy: &'a Policy) -> Self {
        Self { registry, policy }
    }

    /// Resolve a rule's imports into a preamble and the allowed capability set.
    ///
    /// The result is a pure function of the import order, the function table
    /// and the policy: resolving the same inputs twice yields identical text.
    pub fn resolve(&self, rule: &RuleDefinition, functions: &FunctionTable) -> Resolution {
        let mut resolution = Resolution::default();

        for raw in &rule.imports {
            let import = match Import::parse(raw) {
                Ok(import) => import,
                Err(issue) => {
                    skip(&mut resolution, issue);
                    continue;
                }
            };

            match import {
                Import::Function(key) => match functions.get(&key) {
                    Some(literal) => {
                        let literal = literal.trim().trim_end_matches(';').trim_end();
                        // Writing to a String cannot fail.
                        let _ = writeln!(
                            resolution.preamble,
                            "let {} = {literal};",
                            function_identifier(&key)
                        );
                    }
                    None => skip(&mut resolution, ImportIssue::FunctionNotFound { key }),
                },
                Import::Capability(name) => match self.policy.check(self.registry, &name) {
                    Decision::Allow if resolution.allowed.contains(&name) => {
                        skip(&mut resolution, ImportIssue::Duplicate { name });
                    }
                    Decision::Allow => {
                        let _ = writeln!(resolution.preamble, "import \"{name}\" as {name};");
                        resolution.allowed.push(name);
                    }
                    Decision::Deny { .. } => skip(&mut resolution, ImportIssue::Denied { name }),
                    Decision::Unrecognized => {
                        skip(&mut resolution, ImportIssue::Unrecognized { name });
                    }
                },
            }
        }

        resolution
    }
}

fn skip(resolution: &mut Resolution, issue: ImportIssue) {
    tracing::warn!(%issue, "import skipped");
    resolution.issues.push(issue);
}
