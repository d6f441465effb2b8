//! Render stage: enhanced descriptions → image artifacts + images manifest.
//!
//! Per record, in order:
//! 1. the images manifest already points at a valid artifact → keep it;
//! 2. the deterministic artifact for this content is valid on disk → adopt it;
//! 3. otherwise call the [`ImageGenerator`], write the bytes, verify them.
//!
//! A valid artifact is never overwritten.

use std::path::{Path, PathBuf};

use serde::Serialize;

use captionforge_core::{identity, EnhancementRecord, ImageId, RenderParams, RenderRecord};

use crate::capability::{CapabilityError, ImageGenerator};
use crate::error::{io_err, PipelineError};
use crate::manifest::{self, Manifest};
use crate::reconcile::{artifact_path, check_artifact, check_record};
use crate::writer::atomic_write;

/// Everything the render stage needs besides its manifest paths.
pub struct RenderStage<'a> {
    pub generator: &'a dyn ImageGenerator,
    pub params: &'a RenderParams,
    pub output_dir: &'a Path,
    /// File extension without the dot, e.g. `png`.
    pub extension: &'a str,
    /// Persist the manifest after this many generation attempts (0 disables).
    pub checkpoint_every: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub total: usize,
    pub rendered: usize,
    /// Rows whose manifest entry already pointed at a valid artifact.
    pub skipped: usize,
    /// Valid artifacts found on disk and recorded without generating.
    pub adopted: usize,
    pub failed: Vec<ImageId>,
}

#[derive(Debug)]
enum RenderFailure {
    Capability(CapabilityError),
    Write(PipelineError),
    Invalid(String),
}

impl std::fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderFailure::Capability(err) => write!(f, "{err}"),
            RenderFailure::Write(err) => write!(f, "{err}"),
            RenderFailure::Invalid(status) => write!(f, "generated artifact is {status}"),
        }
    }
}

/// Run the render stage from the enhanced manifest into the images manifest.
pub fn run_render(
    enhanced_csv: &Path,
    images_csv: &Path,
    stage: &RenderStage<'_>,
) -> Result<RenderReport, PipelineError> {
    if !enhanced_csv.exists() {
        return Err(PipelineError::MissingInput {
            path: enhanced_csv.to_path_buf(),
        });
    }
    let sources: Manifest<EnhancementRecord> = manifest::load_at(enhanced_csv)?;
    let mut records: Manifest<RenderRecord> = manifest::load_at(images_csv)?;
    std::fs::create_dir_all(stage.output_dir).map_err(|e| io_err(stage.output_dir, e))?;

    let mut report = RenderReport {
        total: sources.len(),
        ..RenderReport::default()
    };
    tracing::info!(total = sources.len(), output = %stage.output_dir.display(), "render stage starting");

    let mut attempted = 0usize;
    for source in sources.values() {
        let id = &source.image_id;
        if records
            .get(id)
            .is_some_and(|existing| check_record(existing, stage.output_dir).is_valid())
        {
            report.skipped += 1;
            continue;
        }

        let name = artifact_name(source, stage.extension);
        let path = stage.output_dir.join(&name);
        if let Some(existing) = records.get(id) {
            remove_stale_artifact(existing, &name, stage.output_dir);
        }
        if check_artifact(&path).is_valid() {
            tracing::debug!(image_id = %id, file_name = %name, "adopting existing artifact");
            records.insert(id.clone(), RenderRecord::from_enhancement(source, Some(name)));
            report.adopted += 1;
            continue;
        }

        attempted += 1;
        match generate_into(source, &path, stage) {
            Ok(()) => {
                tracing::info!(image_id = %id, file_name = %name, "rendered");
                records.insert(id.clone(), RenderRecord::from_enhancement(source, Some(name)));
                report.rendered += 1;
            }
            Err(err) => {
                tracing::warn!(image_id = %id, stage = "render", error = %err, "render failed");
                records.insert(id.clone(), RenderRecord::from_enhancement(source, None));
                report.failed.push(id.clone());
            }
        }

        if stage.checkpoint_every > 0 && attempted % stage.checkpoint_every == 0 {
            manifest::save_at(&records, images_csv)?;
        }
    }

    manifest::save_at(&records, images_csv)?;
    tracing::info!(
        rendered = report.rendered,
        skipped = report.skipped,
        adopted = report.adopted,
        failed = report.failed.len(),
        "render stage finished"
    );
    Ok(report)
}

fn artifact_name(source: &EnhancementRecord, extension: &str) -> String {
    identity::artifact_name(&source.image_id, &source.context, source.prompt_text(), extension)
}

/// Delete the invalid file a record points at when it is not `name`.
fn remove_stale_artifact(record: &RenderRecord, name: &str, output_dir: &Path) {
    let Some(old) = record.file_name.as_deref() else {
        return;
    };
    if identity::normalize_relative(old) == identity::normalize_relative(name) {
        return;
    }
    let Some(path) = artifact_path(output_dir, old) else {
        return;
    };
    if path.is_file() {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(image_id = %record.image_id, file_name = %old, "removed stale artifact")
            }
            Err(err) => {
                tracing::warn!(image_id = %record.image_id, file_name = %old, error = %err, "could not remove stale artifact")
            }
        }
    }
}

fn generate_into(
    source: &EnhancementRecord,
    path: &Path,
    stage: &RenderStage<'_>,
) -> Result<(), RenderFailure> {
    let bytes = stage
        .generator
        .generate(source.prompt_text(), stage.params)
        .map_err(RenderFailure::Capability)?;
    atomic_write(path, &bytes).map_err(RenderFailure::Write)?;

    let status = check_artifact(path);
    if !status.is_valid() {
        let _ = std::fs::remove_file(path);
        return Err(RenderFailure::Invalid(status.to_string()));
    }
    Ok(())
}

/// Enhanced ids that have no valid artifact yet.
pub fn pending_count(
    enhanced_csv: &Path,
    images_csv: &Path,
    output_dir: &Path,
    extension: &str,
) -> Result<usize, PipelineError> {
    let sources: Manifest<EnhancementRecord> = manifest::load_at(enhanced_csv)?;
    let records: Manifest<RenderRecord> = manifest::load_at(images_csv)?;
    Ok(sources
        .values()
        .filter(|source| {
            let recorded = records
                .get(&source.image_id)
                .is_some_and(|r| check_record(r, output_dir).is_valid());
            let on_disk: PathBuf = output_dir.join(artifact_name(source, extension));
            !recorded && !check_artifact(&on_disk).is_valid()
        })
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::io::Cursor;

    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image::RgbImage::new(2, 2)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    struct FixedGenerator {
        bytes: Vec<u8>,
        calls: Cell<usize>,
    }

    impl ImageGenerator for FixedGenerator {
        fn generate(&self, _prompt: &str, _params: &RenderParams) -> Result<Vec<u8>, CapabilityError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.bytes.clone())
        }
    }

    fn write_enhanced(dir: &Path) -> PathBuf {
        let path = dir.join("enhanced.csv");
        fs::write(
            &path,
            "image_id,context,original_description,enhanced_description\n\
             001,kitchen,a red mug,a glossy red mug\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn renders_then_skips_on_rerun() {
        let tmp = TempDir::new().unwrap();
        let enhanced = write_enhanced(tmp.path());
        let images = tmp.path().join("images.csv");
        let out = tmp.path().join("out");
        let generator = FixedGenerator {
            bytes: png_bytes(),
            calls: Cell::new(0),
        };
        let params = RenderParams::default();
        let stage = RenderStage {
            generator: &generator,
            params: &params,
            output_dir: &out,
            extension: "png",
            checkpoint_every: 10,
        };

        let first = run_render(&enhanced, &images, &stage).unwrap();
        assert_eq!(first.rendered, 1);
        let second = run_render(&enhanced, &images, &stage).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(generator.calls.get(), 1);
        assert_eq!(pending_count(&enhanced, &images, &out, "png").unwrap(), 0);
    }

    #[test]
    fn existing_artifact_is_adopted_without_generating() {
        let tmp = TempDir::new().unwrap();
        let enhanced = write_enhanced(tmp.path());
        let images = tmp.path().join("images.csv");
        let out = tmp.path().join("out");
        let name = identity::artifact_name(&ImageId::from("001"), "kitchen", "a glossy red mug", "png");
        let path = out.join(&name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, png_bytes()).unwrap();

        let generator = FixedGenerator {
            bytes: png_bytes(),
            calls: Cell::new(0),
        };
        let params = RenderParams::default();
        let report = run_render(
            &enhanced,
            &images,
            &RenderStage {
                generator: &generator,
                params: &params,
                output_dir: &out,
                extension: "png",
                checkpoint_every: 0,
            },
        )
        .unwrap();

        assert_eq!(report.adopted, 1);
        assert_eq!(generator.calls.get(), 0);
        let saved: Manifest<RenderRecord> = manifest::load_at(&images).unwrap();
        assert_eq!(saved[&ImageId::from("001")].file_name.as_deref(), Some(name.as_str()));
    }

    #[test]
    fn undecodable_output_is_removed_and_recorded_absent() {
        let tmp = TempDir::new().unwrap();
        let enhanced = write_enhanced(tmp.path());
        let images = tmp.path().join("images.csv");
        let out = tmp.path().join("out");
        let generator = FixedGenerator {
            bytes: b"not a png".to_vec(),
            calls: Cell::new(0),
        };
        let params = RenderParams::default();
        let report = run_render(
            &enhanced,
            &images,
            &RenderStage {
                generator: &generator,
                params: &params,
                output_dir: &out,
                extension: "png",
                checkpoint_every: 0,
            },
        )
        .unwrap();

        assert_eq!(report.failed, vec![ImageId::from("001")]);
        let saved: Manifest<RenderRecord> = manifest::load_at(&images).unwrap();
        assert_eq!(saved[&ImageId::from("001")].file_name, None);
        let name = identity::artifact_name(&ImageId::from("001"), "kitchen", "a glossy red mug", "png");
        assert!(!out.join(name).exists());
    }

    #[test]
    fn invalid_recorded_artifact_under_an_old_name_is_removed() {
        let tmp = TempDir::new().unwrap();
        let enhanced = write_enhanced(tmp.path());
        let images = tmp.path().join("images.csv");
        let out = tmp.path().join("out");
        let old_name = identity::artifact_name(&ImageId::from("001"), "kitchen", "a red mug", "png");
        let old_path = out.join(&old_name);
        fs::create_dir_all(old_path.parent().unwrap()).unwrap();
        fs::write(&old_path, b"truncated").unwrap();
        fs::write(
            &images,
            format!(
                "image_id,context,original_description,enhanced_description,file_name\n\
                 001,kitchen,a red mug,,{old_name}\n"
            ),
        )
        .unwrap();

        let generator = FixedGenerator {
            bytes: png_bytes(),
            calls: Cell::new(0),
        };
        let params = RenderParams::default();
        let report = run_render(
            &enhanced,
            &images,
            &RenderStage {
                generator: &generator,
                params: &params,
                output_dir: &out,
                extension: "png",
                checkpoint_every: 0,
            },
        )
        .unwrap();

        assert_eq!(report.rendered, 1);
        assert!(!old_path.exists());
        let new_name = identity::artifact_name(&ImageId::from("001"), "kitchen", "a glossy red mug", "png");
        assert!(out.join(&new_name).is_file());
        let saved: Manifest<RenderRecord> = manifest::load_at(&images).unwrap();
        assert_eq!(saved[&ImageId::from("001")].file_name.as_deref(), Some(new_name.as_str()));
    }

    #[test]
    fn missing_enhanced_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let generator = FixedGenerator {
            bytes: png_bytes(),
            calls: Cell::new(0),
        };
        let params = RenderParams::default();
        let err = run_render(
            &tmp.path().join("enhanced.csv"),
            &tmp.path().join("images.csv"),
            &RenderStage {
                generator: &generator,
                params: &params,
                output_dir: tmp.path(),
                extension: "png",
                checkpoint_every: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }
}
