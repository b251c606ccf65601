//! Errors surfaced by the `quarry` binary.

use thiserror::Error;

use crate::config::ConfigError;

/// Everything a subcommand can fail with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An `--input` argument was not of the form `key=value`.
    #[error("invalid input '{0}': expected key=value")]
    InvalidInput(String),

    /// The blocking rule task panicked or was cancelled.
    #[error("rule task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bundle(#[from] bundle::Error),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
