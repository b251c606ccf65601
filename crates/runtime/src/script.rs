//! The script engine seam.
//!
//! The executor only talks to a [`ScriptEngine`]: it hands over program text,
//! the environment snapshot and the granted capabilities, and gets back a
//! program it can run any number of times.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bundle::{Record, Value};

/// Everything needed to compile one rule.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    /// Preamble followed by the rule body.
    pub source: String,
    /// Exposed to the script as the immutable `env` object.
    pub env: Record,
    /// Capability modules the program may import.
    pub capabilities: Vec<String>,
}

/// Compiles rule source into runnable programs.
pub trait ScriptEngine: Send + Sync {
    fn compile(&self, request: CompileRequest) -> Result<Arc<dyn CompiledProgram>, Diagnostic>;
}

/// A compiled, capability-bound program.
///
/// Programs are shared between concurrent invocations, so each run starts
/// from the bindings captured at compile time.
pub trait CompiledProgram: Send + Sync {
    fn run(&self) -> Result<Globals, Diagnostic>;
}

/// Top-level variables left behind by a program run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Globals(BTreeMap<String, Value>);

impl Globals {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Remove and return a variable.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }
}

impl FromIterator<(String, Value)> for Globals {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stage at which the engine rejected a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Syntax error.
    Parse,
    /// Well-formed but invalid, e.g. an undefined identifier.
    Compile,
    Runtime,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Parse => write!(f, "parse error"),
            DiagnosticKind::Compile => write!(f, "compile error"),
            DiagnosticKind::Runtime => write!(f, "runtime error"),
        }
    }
}

/// An engine diagnostic: kind, message and optional source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}
