//! Error types for the repository.

use std::path::PathBuf;

/// Errors returned by [`Repository`](crate::Repository) operations.
///
/// Missing files and unparsable records are reported as their own
/// variants; raw I/O errors only surface for genuine filesystem failures
/// and always carry the path involved.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A nickname, path or payload was rejected before touching disk.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The record exists but could not be parsed.
    #[error("corrupt record at {path:?}: {reason}")]
    CorruptData { path: PathBuf, reason: String },

    /// The filesystem failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepositoryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for [`RepositoryError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
