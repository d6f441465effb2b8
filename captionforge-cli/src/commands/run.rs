//! `captionforge run`: the full pipeline.
//!
//! Capabilities are built up front from the environment. One that cannot be
//! built (missing API key, unresolvable bucket) is left out with a warning;
//! the pipeline only fails if a stage that has work actually needs it.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use captionforge_pipeline::pipeline::{self, Capabilities, RunOptions, RunReport};
use captionforge_pipeline::{Enhancer, ImageGenerator};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Refuse to sync unless local file count equals images-manifest rows.
    #[arg(long)]
    pub strict: bool,

    /// Plan the sync without uploading.
    #[arg(long, conflicts_with = "skip_sync")]
    pub dry_run_sync: bool,

    /// Do not sync at all.
    #[arg(long)]
    pub skip_sync: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let runtime = super::runtime()?;

        let enhancer = optional("enhancer", super::openai(&config));
        let generator = optional("image generator", super::stability());
        let store = if self.skip_sync && config.csv_files.input.exists() {
            None
        } else {
            optional("object store", super::connect_store(&config, &runtime))
        };

        let caps = Capabilities {
            enhancer: enhancer.as_ref().map(|e| e as &dyn Enhancer),
            generator: generator.as_ref().map(|g| g as &dyn ImageGenerator),
            store,
        };
        let options = RunOptions {
            strict_sync: self.strict,
            dry_run_sync: self.dry_run_sync,
            skip_sync: self.skip_sync,
        };

        let report = pipeline::run(&config, &caps, &options, &runtime);

        if self.json {
            super::print_json(&report)?;
        } else {
            print_report(&report, self.dry_run_sync);
        }
        if !report.is_success() {
            bail!("pipeline finished with failures");
        }
        Ok(())
    }
}

fn optional<T>(what: &str, built: Result<T>) -> Option<T> {
    match built {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(capability = what, error = %format!("{err:#}"), "capability unavailable");
            None
        }
    }
}

fn print_report(report: &RunReport, dry_run_sync: bool) {
    if report.generation_skipped {
        println!("{} all artifacts valid, generation skipped", "✓".green());
    }
    if report.fetched {
        println!("{} input downloaded", "✓".green());
    }
    if let Some(enhance) = &report.enhance {
        println!(
            "{} enhance: {} enhanced, {} already done, {} failed",
            mark(enhance.failed.is_empty()),
            enhance.enhanced,
            enhance.skipped,
            enhance.failed.len()
        );
    }
    if let Some(render) = &report.render {
        println!(
            "{} render: {} rendered, {} adopted, {} already done, {} failed",
            mark(render.failed.is_empty()),
            render.rendered,
            render.adopted,
            render.skipped,
            render.failed.len()
        );
    }
    if let Some(failure) = &report.halted {
        println!("{} {} stage failed: {}", "✗".red(), failure.stage, failure.message);
    }
    if let Some(sync) = &report.sync {
        super::sync::print_report(sync, dry_run_sync);
    }
    if let Some(failure) = &report.sync_failure {
        println!("{} sync failed: {}", "✗".red(), failure.message);
    }
}

fn mark(ok: bool) -> colored::ColoredString {
    if ok {
        "✓".green()
    } else {
        "!".yellow()
    }
}
