use std::path::PathBuf;

use thiserror::Error;

/// Bundle loading errors.
///
/// Any of these is fatal to loading: a bundle is either fully parsed or
/// rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to read bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse bundle: {0}")]
    Parse(String),

    #[error("unsupported bundle format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
