//! `captionforge status`: per-image progress across the three tables.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use captionforge_core::{Config, EnhancementRecord, ImageId, RenderRecord};
use captionforge_pipeline::manifest::{self, Manifest};
use captionforge_pipeline::reconcile::check_record;
use captionforge_pipeline::ArtifactStatus;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let report = build_report(&config)?;
        if self.json {
            return super::print_json(&report);
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    images: Vec<ImageStatus>,
}

#[derive(Debug, Default, Serialize)]
struct StatusSummary {
    total: usize,
    enhanced: usize,
    rendered: usize,
}

#[derive(Debug, Serialize)]
struct ImageStatus {
    image_id: ImageId,
    context: String,
    enhanced: bool,
    file_name: Option<String>,
    artifact: ArtifactStatus,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "image")]
    image_id: String,
    #[tabled(rename = "context")]
    context: String,
    #[tabled(rename = "enhanced")]
    enhanced: String,
    #[tabled(rename = "artifact")]
    artifact: String,
}

fn build_report(config: &Config) -> Result<StatusReport> {
    let files = &config.csv_files;
    let enhanced: Manifest<EnhancementRecord> = manifest::load_at(&files.enhanced_descriptions)
        .with_context(|| format!("failed to read '{}'", files.enhanced_descriptions.display()))?;
    let images: Manifest<RenderRecord> = manifest::load_at(&files.images)
        .with_context(|| format!("failed to read '{}'", files.images.display()))?;

    // The input table defines the work; fall back to the enhanced table when
    // the input has not been fetched yet.
    let units: Vec<(ImageId, String)> = if files.input.exists() {
        manifest::load_work_units(&files.input)?
            .into_iter()
            .map(|u| (u.image_id, u.context))
            .collect()
    } else {
        enhanced
            .values()
            .map(|r| (r.image_id.clone(), r.context.clone()))
            .collect()
    };

    let mut summary = StatusSummary {
        total: units.len(),
        ..StatusSummary::default()
    };
    let rows: Vec<ImageStatus> = units
        .into_iter()
        .map(|(image_id, context)| {
            let is_enhanced = enhanced.get(&image_id).is_some_and(EnhancementRecord::is_enhanced);
            let record = images.get(&image_id);
            let artifact = match record {
                Some(record) => check_record(record, &config.output.directory),
                None => ArtifactStatus::MissingName,
            };
            summary.enhanced += usize::from(is_enhanced);
            summary.rendered += usize::from(artifact.is_valid());
            ImageStatus {
                file_name: record.and_then(|r| r.file_name.clone()),
                image_id,
                context,
                enhanced: is_enhanced,
                artifact,
            }
        })
        .collect();

    Ok(StatusReport {
        summary,
        images: rows,
    })
}

fn print_table(report: &StatusReport) {
    let summary = &report.summary;
    println!(
        "Captionforge v{} | {} images | {} enhanced | {} rendered",
        env!("CARGO_PKG_VERSION"),
        summary.total,
        summary.enhanced,
        summary.rendered,
    );
    if report.images.is_empty() {
        println!("No work units found.");
        return;
    }

    let rows: Vec<StatusTableRow> = report
        .images
        .iter()
        .map(|row| StatusTableRow {
            image_id: row.image_id.to_string(),
            context: row.context.clone(),
            enhanced: if row.enhanced { "yes" } else { "no" }.to_string(),
            artifact: artifact_cell(&row.artifact),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if summary.rendered < summary.total {
        println!("Run 'captionforge run' to process the remaining images.");
    }
}

fn artifact_cell(status: &ArtifactStatus) -> String {
    match status {
        ArtifactStatus::Valid => status.label().green().to_string(),
        ArtifactStatus::MissingName => "pending".bright_black().to_string(),
        other => other.label().red().to_string(),
    }
}
