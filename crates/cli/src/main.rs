//! auditab entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: defaults, `auditab.toml`, `AUDITAB_API_KEYS`
//!    and command-line flags, validated up front.
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or human fmt
//!    layer and an optional OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the [`llm::GeminiEngine`] and the
//!    credential pool, injected into [`audit::ExtractionClient`].
//! 4. **Run the batch** and export one workbook per successful document,
//!    plus the optional `batch-report.json`.
//!
//! Failed documents do not change the exit status; only configuration and
//! I/O errors do.

mod args;
mod config;
mod export;
mod observability;
mod progress;
mod report;
mod sources;

use std::sync::Arc;

use anyhow::Context;
use audit::{ExtractionClient, Flattener, KeyRotationPool};
use batch::{assemble_workbooks, BatchRunner};
use clap::Parser;
use llm::GeminiEngine;

use crate::args::Args;
use crate::config::{FileConfig, Settings, API_KEYS_ENV};
use crate::progress::BarProgress;
use crate::report::RunSummary;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("auditab error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let file = FileConfig::load(args.config.as_deref())?;
    let env_keys = std::env::var(API_KEYS_ENV).ok();
    let settings =
        Settings::resolve(file, env_keys.as_deref(), &args).context("invalid configuration")?;

    let _telemetry = observability::init(&settings.telemetry)?;

    let paths = sources::discover(&settings.inputs)?;
    if paths.is_empty() {
        tracing::warn!("No PDF documents found in the given inputs");
        println!("No PDF documents found; nothing to do.");
        return Ok(());
    }
    let entries = sources::load(&paths)?;

    let pool = KeyRotationPool::new(settings.api_keys.iter().map(String::as_str))?;
    let engine = GeminiEngine::new(&settings.engine)?;
    let client = ExtractionClient::new(Arc::new(engine), Arc::new(pool))
        .with_temperature(settings.temperature);
    let runner = BatchRunner::new(Arc::new(client), settings.batch.clone());

    tracing::info!(
        documents = entries.len(),
        model = %settings.engine.model,
        concurrency = runner.effective_concurrency(),
        "Starting extraction"
    );

    let progress = BarProgress::new(entries.len());
    let report = runner.run(entries, &progress).await;
    progress.finish("done");

    let workbooks = assemble_workbooks(&report, &Flattener::default());
    let exporter = settings.format.exporter();
    let written = export::write_workbooks(&settings.output_dir, &workbooks, exporter)?;

    let summary = RunSummary::new(&report, &written);
    if settings.write_report {
        let path = summary.write(&settings.output_dir)?;
        tracing::info!(path = %path.display(), "Batch report written");
    }

    for (name, error) in summary
        .documents
        .iter()
        .filter_map(|l| l.error.map(|e| (l.name, e)))
    {
        eprintln!("  {name}: {error}");
    }
    println!(
        "Processed {} documents: {} succeeded, {} failed. Output in {}",
        report.outcomes.len(),
        summary.succeeded,
        summary.failed,
        settings.output_dir.display()
    );
    Ok(())
}
