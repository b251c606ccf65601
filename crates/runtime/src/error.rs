use thiserror::Error;

use crate::schema::SchemaViolation;
use crate::script::Diagnostic;

/// Errors surfaced by rule execution.
///
/// Every variant carries the rule identifier. None of them are retried here;
/// retries belong to the capability modules.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("rule '{0}' not found")]
    RuleNotFound(String),

    #[error("failed to compile rule '{rule}': {diagnostic}")]
    Compile {
        rule: String,
        /// Full program text, preamble included.
        code: String,
        diagnostic: Diagnostic,
    },

    #[error("failed to run rule '{rule}': {diagnostic}")]
    Runtime { rule: String, diagnostic: Diagnostic },

    #[error("rule '{rule}' did not set the global variable 'result'")]
    MissingResult { rule: String },

    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

impl Error {
    /// The rule this error belongs to.
    pub fn rule(&self) -> &str {
        match self {
            Error::RuleNotFound(rule)
            | Error::Compile { rule, .. }
            | Error::Runtime { rule, .. }
            | Error::MissingResult { rule } => rule,
            Error::Schema(violation) => violation.category().rule_id(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
