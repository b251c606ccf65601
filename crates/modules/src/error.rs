//! Host module error types.

use rhai::EvalAltResult;
use thiserror::Error;

/// Errors raised by host functions.
///
/// Every variant surfaces inside the script as a runtime error carrying the
/// rendered message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{func}: {message}")]
    Usage { func: &'static str, message: String },

    #[error("{func}: {source}")]
    Http {
        func: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("html: invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn usage(func: &'static str, message: impl Into<String>) -> Self {
        Self::Usage {
            func,
            message: message.into(),
        }
    }
}

impl From<Error> for Box<EvalAltResult> {
    fn from(e: Error) -> Self {
        e.to_string().into()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
