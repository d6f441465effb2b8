//! Error types for captionforge-pipeline.

use std::path::PathBuf;

use thiserror::Error;

use captionforge_core::ConfigError;
use captionforge_prompt::PromptError;
use captionforge_storage::StorageError;

/// Stage-fatal errors. Per-unit capability failures are not represented here;
/// they are logged and recorded as absent fields.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input table does not exist.
    #[error("input file not found: {path}")]
    MissingInput { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV read or write error, with annotated path for context.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Prompt template load or render error.
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Object store or sync error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Convenience constructor for [`PipelineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`PipelineError::Csv`].
pub(crate) fn csv_err(path: impl Into<PathBuf>, source: csv::Error) -> PipelineError {
    PipelineError::Csv {
        path: path.into(),
        source,
    }
}
