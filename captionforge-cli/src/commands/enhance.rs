//! `captionforge enhance`: run the enhance stage on its own.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use captionforge_pipeline::{run_enhance, EnhanceStage};
use captionforge_prompt::PromptTemplate;

#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Emit the stage report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl EnhanceArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let enhancer = super::openai(&config)?;
        let template = PromptTemplate::load_or_builtin(config.enhance.prompt_file.as_deref())
            .context("failed to load prompt template")?;

        let stage = EnhanceStage {
            template: &template,
            enhancer: &enhancer,
            checkpoint_every: config.enhance.checkpoint_every,
        };
        let report = run_enhance(
            &config.csv_files.input,
            &config.csv_files.enhanced_descriptions,
            &stage,
        )
        .context("enhance stage failed")?;

        if self.json {
            return super::print_json(&report);
        }
        println!(
            "✓ enhance: {} enhanced, {} already done, {} failed (of {})",
            report.enhanced,
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
