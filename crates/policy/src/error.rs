//! Policy error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading a policy file.
///
/// Problems with individual rule imports are never errors; the resolver
/// reports them as [`ImportIssue`](crate::ImportIssue)s.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid policy: {0}")]
    Parse(String),

    #[error("cannot read policy {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
