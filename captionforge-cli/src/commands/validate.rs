//! `captionforge validate`: check every images-manifest row.
//!
//! Exits non-zero unless the manifest is non-empty and every artifact decodes.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use captionforge_pipeline::reconcile::validate_at;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Emit the validation report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ValidateArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let manifest = &config.csv_files.images;
        let report = validate_at(manifest, &config.output.directory)
            .with_context(|| format!("failed to read '{}'", manifest.display()))?;

        if self.json {
            super::print_json(&report)?;
        } else if !report.manifest_found {
            println!("{} images manifest not found: {}", "✗".red(), manifest.display());
        } else {
            for row in report.invalid() {
                println!(
                    "  {}  {:<12} {:<40} {}",
                    "✗".red(),
                    row.image_id.to_string(),
                    row.file_name.as_deref().unwrap_or("-"),
                    row.status
                );
            }
            let summary = format!("{}/{} artifacts valid", report.valid_count(), report.total());
            if report.all_valid() {
                println!("{} {summary}", "✓".green());
            } else {
                println!("{} {summary}", "✗".red());
            }
        }

        if !report.all_valid() {
            bail!("validation failed");
        }
        Ok(())
    }
}
