//! `captionforge fetch`: download the input table when absent.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use captionforge_storage::{ensure_input, FetchOutcome};

#[derive(Args, Debug)]
pub struct FetchArgs {}

impl FetchArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let runtime = super::runtime()?;
        let store = super::connect_store(&config, &runtime)?;

        let outcome = runtime
            .block_on(ensure_input(
                store.as_ref(),
                &config.s3.input_key,
                &config.csv_files.input,
            ))
            .with_context(|| format!("failed to fetch '{}'", config.s3.input_key))?;
        match outcome {
            FetchOutcome::AlreadyPresent { path } => {
                println!("✓ {} already present", path.display())
            }
            FetchOutcome::Downloaded { path, bytes } => {
                println!("✓ downloaded {} ({bytes} bytes)", path.display())
            }
        }
        Ok(())
    }
}
