//! Artifact validity and manifest-vs-filesystem reconciliation.
//!
//! Every "is this unit done?" question in the pipeline goes through
//! [`check_artifact`]: the file exists, is non-empty, and decodes as an image.
//! Nothing in this module writes to disk.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use captionforge_core::{identity, ImageId, RenderRecord};

use crate::error::PipelineError;
use crate::manifest;

/// Validity of one manifest row's artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Valid,
    /// The row has no `file_name`.
    MissingName,
    Missing,
    Empty,
    Corrupt { reason: String },
}

impl ArtifactStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ArtifactStatus::Valid)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactStatus::Valid => "valid",
            ArtifactStatus::MissingName => "missing file name",
            ArtifactStatus::Missing => "missing",
            ArtifactStatus::Empty => "empty",
            ArtifactStatus::Corrupt { .. } => "corrupt",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactStatus::Corrupt { reason } => write!(f, "corrupt ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Single artifact
// ---------------------------------------------------------------------------

/// Check the file at `path`: exists, non-empty, decodes as an image.
pub fn check_artifact(path: &Path) -> ArtifactStatus {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return ArtifactStatus::Missing,
        Err(err) => {
            return ArtifactStatus::Corrupt {
                reason: err.to_string(),
            }
        }
    };
    if !meta.is_file() {
        return ArtifactStatus::Missing;
    }
    if meta.len() == 0 {
        return ArtifactStatus::Empty;
    }

    let decoded = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| e.to_string())
        .and_then(|reader| reader.decode().map_err(|e| e.to_string()));
    match decoded {
        Ok(_) => ArtifactStatus::Valid,
        Err(reason) => ArtifactStatus::Corrupt { reason },
    }
}

/// Absolute location of a manifest `file_name` under `output_dir`.
///
/// `None` when the name would escape the output directory.
pub fn artifact_path(output_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let relative = identity::normalize_relative(file_name);
    if relative.is_empty() || relative.split('/').any(|seg| seg == "..") {
        return None;
    }
    Some(output_dir.join(relative))
}

/// Validity of the artifact referenced by `record`.
pub fn check_record(record: &RenderRecord, output_dir: &Path) -> ArtifactStatus {
    let Some(name) = record.file_name.as_deref() else {
        return ArtifactStatus::MissingName;
    };
    match artifact_path(output_dir, name) {
        Some(path) => check_artifact(&path),
        None => ArtifactStatus::Corrupt {
            reason: format!("'{name}' escapes the output directory"),
        },
    }
}

// ---------------------------------------------------------------------------
// Whole manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowValidation {
    pub image_id: ImageId,
    pub file_name: Option<String>,
    pub status: ArtifactStatus,
}

/// Per-row validation of an images manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub manifest_found: bool,
    pub rows: Vec<RowValidation>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn valid_count(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_valid()).count()
    }

    pub fn invalid(&self) -> impl Iterator<Item = &RowValidation> {
        self.rows.iter().filter(|r| !r.status.is_valid())
    }

    /// True iff the manifest is non-empty and every row is valid.
    pub fn all_valid(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.status.is_valid())
    }
}

/// Validate every row of the images manifest at `manifest_path`.
pub fn validate_at(manifest_path: &Path, output_dir: &Path) -> Result<ValidationReport, PipelineError> {
    if !manifest_path.exists() {
        tracing::warn!(path = %manifest_path.display(), "images manifest not found");
        return Ok(ValidationReport::default());
    }

    let records = manifest::load_at::<RenderRecord>(manifest_path)?;
    let rows: Vec<RowValidation> = records
        .values()
        .map(|record| RowValidation {
            image_id: record.image_id.clone(),
            file_name: record.file_name.clone(),
            status: check_record(record, output_dir),
        })
        .collect();

    for row in rows.iter().filter(|r| !r.status.is_valid()) {
        tracing::warn!(
            image_id = %row.image_id,
            file_name = row.file_name.as_deref().unwrap_or(""),
            status = %row.status,
            "invalid artifact"
        );
    }

    let report = ValidationReport {
        manifest_found: true,
        rows,
    };
    tracing::info!(
        total = report.total(),
        valid = report.valid_count(),
        invalid = report.total() - report.valid_count(),
        "validation complete"
    );
    Ok(report)
}

/// The pipeline's skip gate: true iff the manifest exists, is non-empty,
/// and every row's artifact is valid. Read errors count as "not valid".
pub fn all_artifacts_valid(manifest_path: &Path, output_dir: &Path) -> bool {
    match validate_at(manifest_path, output_dir) {
        Ok(report) => report.all_valid(),
        Err(err) => {
            tracing::warn!(path = %manifest_path.display(), error = %err, "validation failed");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
