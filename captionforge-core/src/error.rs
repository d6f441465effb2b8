//! Error types for captionforge-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration loading and resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a configuration document.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// A required environment variable is unset or empty.
    #[error("environment variable {var} is not set")]
    MissingEnv { var: String },

    /// A value is present but unusable (e.g. an empty output format).
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
