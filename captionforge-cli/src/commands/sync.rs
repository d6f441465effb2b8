//! `captionforge sync`: mirror the output directory into the bucket.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use captionforge_core::RenderRecord;
use captionforge_pipeline::manifest;
use captionforge_storage::{sync_dir, SyncOptions, SyncReport};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would be uploaded without uploading anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Refuse to sync unless local file count equals images-manifest rows.
    #[arg(long)]
    pub strict: bool,

    /// Emit the sync report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let expected_files = if self.strict || config.sync.strict {
            Some(manifest::row_count::<RenderRecord>(&config.csv_files.images)?)
        } else {
            None
        };
        let options = SyncOptions {
            remote_prefix: config.sync.remote_prefix.clone(),
            concurrency: config.sync.concurrency,
            expected_files,
            dry_run: self.dry_run,
        };

        let runtime = super::runtime()?;
        let store = super::connect_store(&config, &runtime)?;
        let report = runtime
            .block_on(sync_dir(&config.output.directory, store, &options))
            .context("sync failed")?;

        if self.json {
            super::print_json(&report)?;
        } else {
            print_report(&report, self.dry_run);
        }
        if !report.is_clean() {
            bail!("{} upload(s) failed", report.failed.len());
        }
        Ok(())
    }
}

pub(crate) fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.planned.is_empty() && report.uploaded.is_empty() && report.failed.is_empty() {
        println!(
            "{prefix}✓ sync: nothing to do ({} files already remote)",
            report.already_remote
        );
        return;
    }
    println!(
        "{prefix}✓ sync: {} uploaded, {} already remote, {} failed",
        if dry_run { report.planned.len() } else { report.uploaded.len() },
        report.already_remote,
        report.failed.len()
    );
    for plan in &report.planned {
        println!("  ~  {}", plan.key);
    }
    for key in &report.uploaded {
        println!("  ↑  {key}");
    }
    for failure in &report.failed {
        println!("  ✗  {} ({})", failure.key, failure.error);
    }
}
