//! Error type shared by the query builder, fetcher and exporters.

use std::path::Path;

/// Errors that can occur during a grants search run
#[derive(Debug, thiserror::Error)]
pub enum GrantsError {
    /// A user supplied value is out of range or inconsistent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected status code or undecodable body
    #[error("Response error: {0}")]
    Response(String),

    /// An output file could not be created or written
    #[error("Filesystem error: {0}")]
    Filesystem(String),
}

impl GrantsError {
    /// Build a filesystem error that names the offending path
    pub fn filesystem(path: &Path, err: impl std::fmt::Display) -> Self {
        GrantsError::Filesystem(format!("{}: {}", path.display(), err))
    }
}

impl From<std::io::Error> for GrantsError {
    fn from(err: std::io::Error) -> Self {
        GrantsError::Filesystem(err.to_string())
    }
}
