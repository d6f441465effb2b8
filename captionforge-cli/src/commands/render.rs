//! `captionforge render`: run the render stage on its own.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use captionforge_pipeline::{run_render, RenderStage};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Emit the stage report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RenderArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let generator = super::stability()?;
        let extension = config.output.extension()?;

        let stage = RenderStage {
            generator: &generator,
            params: &config.render,
            output_dir: &config.output.directory,
            extension: &extension,
            checkpoint_every: config.enhance.checkpoint_every,
        };
        let report = run_render(
            &config.csv_files.enhanced_descriptions,
            &config.csv_files.images,
            &stage,
        )
        .context("render stage failed")?;

        if self.json {
            return super::print_json(&report);
        }
        println!(
            "✓ render: {} rendered, {} adopted, {} already done, {} failed (of {})",
            report.rendered,
            report.adopted,
            report.skipped,
            report.failed.len(),
            report.total
        );
        for id in &report.failed {
            println!("  ✗  {id}");
        }
        Ok(())
    }
}
