//! Top-level orchestration shared by `captionforge run` and the tests.
//!
//! ```text
//! validation gate ──all valid──────────────────────────────┐
//!        │ otherwise                                       ▼
//!        └─> fetch (if input missing) ─> enhance ─> render ─> sync
//! ```
//!
//! A failing generation stage halts the stages after it; sync is attempted
//! regardless, so artifacts produced before the failure are still mirrored.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use captionforge_core::{Config, RenderRecord};
use captionforge_prompt::PromptTemplate;
use captionforge_storage::{ensure_input, sync_dir, FetchOutcome, ObjectStore, SyncOptions, SyncReport};

use crate::capability::{Enhancer, ImageGenerator};
use crate::enhance::{self, run_enhance, EnhanceReport, EnhanceStage};
use crate::error::PipelineError;
use crate::manifest;
use crate::reconcile::all_artifacts_valid;
use crate::render::{self, run_render, RenderReport, RenderStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Fetch,
    Enhance,
    Render,
    Sync,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Enhance => "enhance",
            Stage::Render => "render",
            Stage::Sync => "sync",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

impl StageFailure {
    fn new(stage: Stage, message: impl fmt::Display) -> Self {
        tracing::error!(stage = %stage, error = %message, "stage failed");
        Self {
            stage,
            message: message.to_string(),
        }
    }
}

/// External capabilities handed to [`run`]. A missing capability only
/// matters to the stage that needs it, and only when that stage has work.
#[derive(Default, Clone)]
pub struct Capabilities<'a> {
    pub enhancer: Option<&'a dyn Enhancer>,
    pub generator: Option<&'a dyn ImageGenerator>,
    pub store: Option<Arc<dyn ObjectStore>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Require local file count == images manifest rows before syncing.
    pub strict_sync: bool,
    pub dry_run_sync: bool,
    pub skip_sync: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// The validation gate passed; enhance and render did not run.
    pub generation_skipped: bool,
    /// The input table was downloaded this run.
    pub fetched: bool,
    pub enhance: Option<EnhanceReport>,
    pub render: Option<RenderReport>,
    pub sync: Option<SyncReport>,
    /// First generation-stage failure; later generation stages were skipped.
    pub halted: Option<StageFailure>,
    pub sync_failure: Option<StageFailure>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            generation_skipped: false,
            fetched: false,
            enhance: None,
            render: None,
            sync: None,
            halted: None,
            sync_failure: None,
        }
    }

    /// No stage failed and every attempted upload succeeded.
    pub fn is_success(&self) -> bool {
        self.halted.is_none()
            && self.sync_failure.is_none()
            && self.sync.as_ref().map_or(true, SyncReport::is_clean)
    }
}

/// Run the whole pipeline for `config`.
///
/// Async storage calls are driven on `runtime`; everything else is blocking.
pub fn run(
    config: &Config,
    caps: &Capabilities<'_>,
    options: &RunOptions,
    runtime: &tokio::runtime::Runtime,
) -> RunReport {
    let mut report = RunReport::new();

    if all_artifacts_valid(&config.csv_files.images, &config.output.directory) {
        tracing::info!("all artifacts valid, skipping generation");
        report.generation_skipped = true;
    } else if let Err(failure) = generate(config, caps, runtime, &mut report) {
        report.halted = Some(failure);
    }

    if options.skip_sync {
        tracing::info!("sync skipped");
    } else {
        match sync(config, caps, options, runtime) {
            Ok(sync) => report.sync = Some(sync),
            Err(failure) => report.sync_failure = Some(failure),
        }
    }
    report
}

fn generate(
    config: &Config,
    caps: &Capabilities<'_>,
    runtime: &tokio::runtime::Runtime,
    report: &mut RunReport,
) -> Result<(), StageFailure> {
    let files = &config.csv_files;

    if !files.input.exists() {
        let store = caps
            .store
            .as_ref()
            .ok_or_else(|| StageFailure::new(Stage::Fetch, "input missing and no object store configured"))?;
        let outcome = runtime
            .block_on(ensure_input(&**store, &config.s3.input_key, &files.input))
            .map_err(|e| StageFailure::new(Stage::Fetch, e))?;
        report.fetched = matches!(outcome, FetchOutcome::Downloaded { .. });
    }

    let pending = enhance::pending_count(&files.input, &files.enhanced_descriptions)
        .map_err(|e| StageFailure::new(Stage::Enhance, e))?;
    if pending > 0 {
        let enhancer = caps
            .enhancer
            .ok_or_else(|| StageFailure::new(Stage::Enhance, "no enhancement capability configured"))?;
        let outcome = PromptTemplate::load_or_builtin(config.enhance.prompt_file.as_deref())
            .map_err(PipelineError::from)
            .and_then(|template| {
                let stage = EnhanceStage {
                    template: &template,
                    enhancer,
                    checkpoint_every: config.enhance.checkpoint_every,
                };
                run_enhance(&files.input, &files.enhanced_descriptions, &stage)
            });
        report.enhance = Some(outcome.map_err(|e| StageFailure::new(Stage::Enhance, e))?);
    } else {
        tracing::info!("nothing to enhance");
    }

    let extension = config
        .output
        .extension()
        .map_err(|e| StageFailure::new(Stage::Render, e))?;
    let pending = render::pending_count(
        &files.enhanced_descriptions,
        &files.images,
        &config.output.directory,
        &extension,
    )
    .map_err(|e| StageFailure::new(Stage::Render, e))?;
    // An empty input never produces an enhanced manifest.
    if pending == 0 && !files.enhanced_descriptions.exists() {
        tracing::info!("nothing to render");
        return Ok(());
    }
    let generator = match caps.generator {
        Some(generator) => generator,
        None if pending == 0 => {
            tracing::info!("nothing to render");
            return Ok(());
        }
        None => return Err(StageFailure::new(Stage::Render, "no image generation capability configured")),
    };
    let stage = RenderStage {
        generator,
        params: &config.render,
        output_dir: &config.output.directory,
        extension: &extension,
        checkpoint_every: config.enhance.checkpoint_every,
    };
    let outcome = run_render(&files.enhanced_descriptions, &files.images, &stage)
        .map_err(|e| StageFailure::new(Stage::Render, e))?;
    report.render = Some(outcome);
    Ok(())
}

fn sync(
    config: &Config,
    caps: &Capabilities<'_>,
    options: &RunOptions,
    runtime: &tokio::runtime::Runtime,
) -> Result<SyncReport, StageFailure> {
    let store = caps
        .store
        .clone()
        .ok_or_else(|| StageFailure::new(Stage::Sync, "no object store configured"))?;

    let expected_files = if options.strict_sync || config.sync.strict {
        let rows = manifest::row_count::<RenderRecord>(&config.csv_files.images)
            .map_err(|e| StageFailure::new(Stage::Sync, e))?;
        Some(rows)
    } else {
        None
    };
    let sync_options = SyncOptions {
        remote_prefix: config.sync.remote_prefix.clone(),
        concurrency: config.sync.concurrency,
        expected_files,
        dry_run: options.dry_run_sync,
    };
    runtime
        .block_on(sync_dir(&config.output.directory, store, &sync_options))
        .map_err(|e| StageFailure::new(Stage::Sync, e))
}
