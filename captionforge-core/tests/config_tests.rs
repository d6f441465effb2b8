//! Config load error-message and section-default integration tests.

use std::fs;
use std::path::PathBuf;

use captionforge_core::{config, ConfigError};

const FULL: &str = r#"
csv_files:
  input: data/input.csv
  enhanced_descriptions: data/enhanced_descriptions.csv
  images: data/images.csv
s3:
  bucket_name: ${S3_BUCKET_NAME}
  input_key: captions/input.csv
output:
  directory: generated_images
  format: png
stability_ai:
  steps: 40
  cfg_scale: 8.5
  width: 768
  height: 512
  samples: 1
  sampler: K_EULER
  style_preset: photographic
  clip_guidance_preset: FAST_BLUE
enhance:
  model: gpt-4o-mini
sync:
  concurrency: 4
  strict: true
"#;

const MINIMAL: &str = r#"
csv_files:
  input: input.csv
  enhanced_descriptions: enhanced.csv
  images: images.csv
s3:
  bucket_name: static-bucket
  input_key: input.csv
output:
  directory: out
  format: jpg
"#;

fn write_config(dir: &assert_fs::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.yml");
    fs::write(&path, body).expect("write config");
    path
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(&dir.path().join("nope.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("nope.yml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, ": : corrupt : yaml : !!!\n  - broken: [unclosed");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yml"));
}

#[test]
fn load_missing_section_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, "output:\n  directory: out\n  format: png\n");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn load_rejects_unusable_format() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, &MINIMAL.replace("format: jpg", "format: \"a/b\""));
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "output.format", .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Sections
// ---------------------------------------------------------------------------

#[test]
fn full_document_populates_every_section() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::load_at(&write_config(&dir, FULL)).expect("load");

    assert_eq!(cfg.csv_files.images, PathBuf::from("data/images.csv"));
    assert_eq!(cfg.s3.input_key, "captions/input.csv");
    assert_eq!(cfg.output.extension().unwrap(), "png");
    assert_eq!(cfg.render.steps, 40);
    assert_eq!(cfg.render.height, 512);
    assert_eq!(cfg.render.style_preset.as_deref(), Some("photographic"));
    assert_eq!(cfg.render.negative_prompt, None);
    assert_eq!(cfg.enhance.model, "gpt-4o-mini");
    assert_eq!(cfg.sync.concurrency, 4);
    assert!(cfg.sync.strict);
    assert_eq!(cfg.sync.remote_prefix, config::DEFAULT_REMOTE_PREFIX);
}

#[test]
fn minimal_document_uses_defaults() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::load_at(&write_config(&dir, MINIMAL)).expect("load");

    assert_eq!(cfg.render.samples, 1);
    assert_eq!(cfg.enhance.model, "gpt-4o");
    assert_eq!(cfg.enhance.checkpoint_every, 10);
    assert_eq!(cfg.sync.concurrency, 10);
    assert!(!cfg.sync.strict);
    assert_eq!(cfg.s3.bucket_with(|_| None).expect("literal"), "static-bucket");
}

#[test]
fn placeholder_bucket_requires_environment() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::load_at(&write_config(&dir, FULL)).expect("load");

    let err = cfg.s3.bucket_with(|_| None).unwrap_err();
    assert!(err.to_string().contains("S3_BUCKET_NAME"), "got: {err}");

    let resolved = cfg
        .s3
        .bucket_with(|_| Some("  media-bucket ".to_string()))
        .expect("resolve");
    assert_eq!(resolved, "media-bucket");
}

#[test]
fn shipped_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../configs/config.yml");
    let config = config::load_at(&path).expect("shipped config");
    assert_eq!(config.output.extension().unwrap(), "png");
    assert_eq!(config.render.negative_prompt.as_deref(), Some("blurry, low quality, watermark, text"));
    assert_eq!(config.sync.remote_prefix, "batch_generated_images");
}
