//! Captionforge: resumable caption → description → image pipeline.
//!
//! # Usage
//!
//! ```text
//! captionforge [--config <path>] run [--strict] [--dry-run-sync] [--skip-sync] [--json]
//! captionforge [--config <path>] fetch
//! captionforge [--config <path>] enhance
//! captionforge [--config <path>] render
//! captionforge [--config <path>] validate [--json]
//! captionforge [--config <path>] status [--json]
//! captionforge [--config <path>] sync [--dry-run] [--strict]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use captionforge_core::config::DEFAULT_CONFIG_PATH;
use commands::{
    enhance::EnhanceArgs, fetch::FetchArgs, render::RenderArgs, run::RunArgs, status::StatusArgs,
    sync::SyncArgs, validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "captionforge",
    version,
    about = "Turn image captions into enhanced descriptions, rendered images and a mirrored bucket",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the whole pipeline: validate, fetch, enhance, render, sync.
    Run(RunArgs),

    /// Download the input table from the bucket if it is missing locally.
    Fetch(FetchArgs),

    /// Enhance every caption that has no enhanced description yet.
    Enhance(EnhanceArgs),

    /// Render every enhanced description that has no valid image yet.
    Render(RenderArgs),

    /// Check that every images-manifest row points at a decodable image.
    Validate(ValidateArgs),

    /// Show per-image progress across the three tables.
    Status(StatusArgs),

    /// Upload generated images that are not yet in the bucket.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config.as_path();
    match cli.command {
        Commands::Run(args) => args.run(config),
        Commands::Fetch(args) => args.run(config),
        Commands::Enhance(args) => args.run(config),
        Commands::Render(args) => args.run(config),
        Commands::Validate(args) => args.run(config),
        Commands::Status(args) => args.run(config),
        Commands::Sync(args) => args.run(config),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
