//! YAML configuration document.
//!
//! # Layout
//!
//! ```yaml
//! csv_files:
//!   input: data/input.csv
//!   enhanced_descriptions: data/enhanced_descriptions.csv
//!   images: data/images.csv
//! s3:
//!   bucket_name: ${S3_BUCKET_NAME}
//!   input_key: input/input.csv
//! output:
//!   directory: generated_images
//!   format: png
//! stability_ai:
//!   steps: 30
//!   cfg_scale: 7.0
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit path; used in tests with `TempDir`
//! - `load()`: reads [`DEFAULT_CONFIG_PATH`], delegates to `load_at`
//!
//! Placeholders are resolved at use-time, not at load, so a missing bucket
//! only stops the stages that need the bucket.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::RenderParams;

/// Where `load()` looks when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "./configs/config.yml";

/// Remote prefix artifacts are mirrored under when none is configured.
pub const DEFAULT_REMOTE_PREFIX: &str = "batch_generated_images";

/// Environment variable holding the enhancement API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the image-generation API key.
pub const STABILITY_API_KEY_VAR: &str = "STABILITY_API_KEY";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `csv_files`: the three tables the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFiles {
    pub input: PathBuf,
    pub enhanced_descriptions: PathBuf,
    pub images: PathBuf,
}

/// `s3`: bucket and input object location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Settings {
    /// Literal bucket name or a `${VAR}` placeholder.
    pub bucket_name: String,
    pub input_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl S3Settings {
    /// Resolve the bucket name against the process environment.
    pub fn bucket(&self) -> Result<String, ConfigError> {
        self.bucket_with(|var| std::env::var(var).ok())
    }

    /// Resolve the bucket name with an explicit variable lookup.
    pub fn bucket_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        resolve_placeholder(&self.bucket_name, lookup)
    }
}

/// `output`: local artifact directory and image file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub directory: PathBuf,
    /// File extension for new artifacts. It does not select an encoding:
    /// files hold whatever the generator returns (PNG for Stability).
    pub format: String,
}

impl OutputSettings {
    /// Lowercased extension without a leading dot.
    ///
    /// Only names files; `jpg` still stores the generator's PNG bytes.
    pub fn extension(&self) -> Result<String, ConfigError> {
        let ext = self.format.trim().trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "output.format",
                reason: format!("'{}' is not a file extension", self.format),
            });
        }
        Ok(ext)
    }
}

/// `enhance`: chat-completion model and prompt template location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceSettings {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
    /// Persist the manifest after this many processed units (0 = only at the end).
    pub checkpoint_every: usize,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            prompt_file: Some(PathBuf::from("./configs/describe.yml")),
            checkpoint_every: 10,
        }
    }
}

/// `sync`: remote mirroring of the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub remote_prefix: String,
    pub concurrency: usize,
    /// Refuse to sync unless the local file count equals the manifest row count.
    pub strict: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote_prefix: DEFAULT_REMOTE_PREFIX.to_string(),
            concurrency: 10,
            strict: false,
        }
    }
}

/// Root of the YAML configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub csv_files: CsvFiles,
    pub s3: S3Settings,
    pub output: OutputSettings,
    #[serde(default, rename = "stability_ai", alias = "render")]
    pub render: RenderParams,
    #[serde(default)]
    pub enhance: EnhanceSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the configuration document at `path`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.output.extension()?;
    Ok(config)
}

/// `load_at` convenience wrapper for [`DEFAULT_CONFIG_PATH`].
pub fn load() -> Result<Config, ConfigError> {
    load_at(Path::new(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Read a required, non-empty environment variable.
pub fn require_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv {
            var: var.to_string(),
        }),
    }
}

/// Expand a whole-value `${VAR}` placeholder; literals pass through.
fn resolve_placeholder(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let Some(var) = trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid {
                field: "s3.bucket_name",
                reason: "empty".to_string(),
            });
        }
        return Ok(trimmed.to_string());
    };
    match lookup(var.trim()) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnv {
            var: var.trim().to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
