//! Error types for captionforge-prompt.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or rendering a prompt template.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// The template document is not valid YAML or lacks `messages`.
    #[error("failed to parse prompt template {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The template document has an empty `messages` list.
    #[error("prompt template {origin} has no messages")]
    NoMessages { origin: String },

    /// Filesystem error while reading a template document.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
