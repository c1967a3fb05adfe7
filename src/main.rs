//! NSE Breadth Pipeline — Entry Point
//!
//! Invoked once per trading day by an external scheduler. Wiring:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build the configured close source (quote API or bulk file)
//! 4. Build the filesystem artifact store
//! 5. Run the pipeline once and exit (non-zero on fatal error)
//!
//! The only flag is `--backfill`, which forces a full EMA-window
//! re-seed instead of an incremental top-up.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

mod adapters;
mod config;
mod domain;
mod error;
mod ports;
mod usecases;

use adapters::persistence::FsArtifactStore;
use adapters::sources::{BulkFileSource, QuoteApiSource, RetryPolicy};
use config::SourceKind;
use ports::close_source::CloseSource;
use usecases::{Pipeline, RunMode};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Tracing may not be initialized if config loading failed.
            error!(error = ?e, "Run aborted");
            eprintln!("nse-breadth-pipeline: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.job.log_level)),
        )
        .json()
        .init();

    let mode = if std::env::args().any(|a| a == "--backfill") {
        RunMode::Backfill
    } else {
        RunMode::Incremental
    };

    info!(
        name = %config.job.name,
        version = env!("CARGO_PKG_VERSION"),
        source = ?config.source.kind,
        ?mode,
        "Starting NSE breadth pipeline"
    );

    let retry = RetryPolicy::new(&config.retry);
    let source: Arc<dyn CloseSource> = match config.source.kind {
        SourceKind::QuoteApi => Arc::new(
            QuoteApiSource::from_config(config.source.quote.clone(), retry)
                .context("Failed to build quote-API source")?,
        ),
        SourceKind::BulkFile => Arc::new(
            BulkFileSource::from_config(config.source.bulk.clone(), retry)
                .context("Failed to build bulk-file source")?,
        ),
    };

    let artifacts = Arc::new(
        FsArtifactStore::new(&config.artifacts.data_dir)
            .await
            .context("Failed to open artifact store")?,
    );

    let pipeline = Pipeline::new(source, artifacts, config);
    let report = pipeline.run(mode).await.context("Pipeline run failed")?;

    info!(
        dt = %report.snapshot.trading_date,
        universe = report.snapshot.universe_count,
        signal = %report.snapshot.signal,
        health = report.snapshot.market_health_pct,
        fetched = report.fetched,
        failed = report.failed,
        "Updated dashboard artifacts"
    );
    Ok(())
}
