//! Subcommand implementations and the capability wiring they share.

pub mod enhance;
pub mod fetch;
pub mod render;
pub mod run;
pub mod status;
pub mod sync;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use captionforge_core::config::{self, OPENAI_API_KEY_VAR, STABILITY_API_KEY_VAR};
use captionforge_core::Config;
use captionforge_pipeline::providers::{OpenAiEnhancer, StabilityGenerator};
use captionforge_storage::{ObjectStore, S3Store};

pub(crate) fn load_config(path: &Path) -> Result<Config> {
    config::load_at(path).with_context(|| format!("failed to load config '{}'", path.display()))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

/// S3 store for the configured bucket.
pub(crate) fn connect_store(
    config: &Config,
    runtime: &tokio::runtime::Runtime,
) -> Result<Arc<dyn ObjectStore>> {
    let bucket = config.s3.bucket().context("cannot resolve s3.bucket_name")?;
    let store = runtime.block_on(S3Store::connect(bucket, config.s3.region.clone()));
    Ok(Arc::new(store))
}

pub(crate) fn openai(config: &Config) -> Result<OpenAiEnhancer> {
    let key = config::require_env(OPENAI_API_KEY_VAR).context("enhancement needs an API key")?;
    Ok(OpenAiEnhancer::new(key, config.enhance.model.clone()))
}

pub(crate) fn stability() -> Result<StabilityGenerator> {
    let key = config::require_env(STABILITY_API_KEY_VAR).context("rendering needs an API key")?;
    Ok(StabilityGenerator::new(key))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON")?
    );
    Ok(())
}
