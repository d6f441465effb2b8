//! Error types for captionforge-storage.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from object-store and sync operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The remote store rejected or failed an operation.
    #[error("remote {op} failed for '{key}': {message}")]
    Remote {
        op: &'static str,
        key: String,
        message: String,
    },

    /// The requested object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local directory to mirror does not exist.
    #[error("local directory not found: {path}")]
    MissingDirectory { path: PathBuf },

    /// Strict mode: the local file count disagrees with the manifest.
    #[error("refusing to sync {path}: {local} local file(s) but {expected} manifest row(s)")]
    FileCountMismatch {
        path: PathBuf,
        local: usize,
        expected: usize,
    },
}

/// Convenience constructor for [`StorageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`StorageError::Remote`].
pub(crate) fn remote_err(op: &'static str, key: &str, message: impl ToString) -> StorageError {
    StorageError::Remote {
        op,
        key: key.to_string(),
        message: message.to_string(),
    }
}
