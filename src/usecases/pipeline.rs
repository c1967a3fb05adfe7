//! Pipeline Orchestrator - The Once-Per-Trading-Day Run
//!
//! Sequences the components strictly linearly: load universe → fetch →
//! update rolling store → compute metrics → upsert history → persist
//! latest + history. Any fatal error aborts the run without writing the
//! snapshot or history artifacts; the rolling store may already have
//! been persisted by then, which is safe — raw price ingestion is
//! idempotent and valuable independent of the snapshot.
//!
//! Precondition: single-writer access to the artifact store. Concurrent
//! runs against the same store require external mutual exclusion.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::adapters::persistence::closes_codec;
use crate::config::AppConfig;
use crate::domain::breadth::MetricsEngine;
use crate::domain::prices::RollingStore;
use crate::domain::snapshot::{DailySnapshot, HistoryEntry, HistoryLedger};
use crate::error::PipelineError;
use crate::ports::artifact_store::ArtifactStore;
use crate::ports::close_source::{CloseSource, FetchWindow};
use crate::usecases::universe;

/// How the run acquires history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Top up an existing rolling store with the latest closes.
    Incremental,
    /// Re-seed the full EMA window regardless of stored state.
    Backfill,
}

/// Summary of a completed run, for logging and exit reporting.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: DailySnapshot,
    pub universe_size: usize,
    pub fetched: usize,
    pub failed: usize,
    pub points_inserted: usize,
    pub history_len: usize,
}

/// The daily breadth pipeline.
pub struct Pipeline {
    source: Arc<dyn CloseSource>,
    artifacts: Arc<dyn ArtifactStore>,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn CloseSource>,
        artifacts: Arc<dyn ArtifactStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            source,
            artifacts,
            config,
        }
    }

    /// Execute one full run.
    #[instrument(skip(self), name = "daily_run", fields(source = self.source.name()))]
    pub async fn run(&self, mode: RunMode) -> Result<RunReport, PipelineError> {
        let universe = universe::load_universe(&self.config.universe).await?;
        let mut store = self.load_rolling_store().await?;

        let window = if mode == RunMode::Backfill || store.is_empty() {
            FetchWindow::Seed
        } else {
            FetchWindow::Incremental
        };
        let as_of = Utc::now().date_naive();

        info!(
            universe = universe.len(),
            stored_symbols = store.symbol_count(),
            ?window,
            %as_of,
            "Starting acquisition"
        );

        let outcome = self.source.fetch_closes(&universe, as_of, window).await?;
        let fetched = outcome.closes.len();
        let failed = outcome.failed.len();
        if failed > 0 {
            warn!(
                failed,
                fetched, "Some symbols failed to fetch; they reduce the eligible count"
            );
        }

        let points_inserted = store.upsert(outcome.into_points());
        info!(points_inserted, total_points = store.point_count(), "Rolling store updated");

        // Persist the ledger before computing metrics: if the breadth
        // calculation fails, today's ingested closes still count toward
        // tomorrow's history requirement.
        let ledger_bytes = closes_codec::encode(&store)
            .map_err(|e| PipelineError::Artifact(format!("encode closes ledger: {e}")))?;
        self.artifacts
            .write(&self.config.artifacts.closes_key, &ledger_bytes)
            .await
            .map_err(|e| PipelineError::Artifact(format!("write closes ledger: {e}")))?;

        let engine = MetricsEngine::new(self.config.metrics.clone());
        let snapshot = engine.compute(&store)?;

        let mut history = self.load_history().await?;
        history.upsert(snapshot.to_history_entry());

        let latest_bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| PipelineError::Artifact(format!("serialize snapshot: {e}")))?;
        let history_bytes = serde_json::to_vec_pretty(history.entries())
            .map_err(|e| PipelineError::Artifact(format!("serialize history: {e}")))?;

        self.artifacts
            .write(&self.config.artifacts.latest_key, &latest_bytes)
            .await
            .map_err(|e| PipelineError::Artifact(format!("write latest snapshot: {e}")))?;
        self.artifacts
            .write(&self.config.artifacts.history_key, &history_bytes)
            .await
            .map_err(|e| PipelineError::Artifact(format!("write history: {e}")))?;

        let report = RunReport {
            universe_size: universe.len(),
            fetched,
            failed,
            points_inserted,
            history_len: history.len(),
            snapshot,
        };

        info!(
            dt = %report.snapshot.trading_date,
            universe = report.snapshot.universe_count,
            signal = %report.snapshot.signal,
            history_len = report.history_len,
            "Run complete"
        );
        Ok(report)
    }

    /// Load the rolling store from the closes artifact.
    ///
    /// Missing artifact → empty store (first run). Unreadable artifact →
    /// warn and continue from empty; the ledger rebuilds itself over the
    /// following runs.
    async fn load_rolling_store(&self) -> Result<RollingStore, PipelineError> {
        let retention = self.config.retention.close_points;
        let key = &self.config.artifacts.closes_key;
        let bytes = self
            .artifacts
            .read(key)
            .await
            .map_err(|e| PipelineError::Artifact(format!("read closes ledger: {e}")))?;

        Ok(match bytes {
            None => RollingStore::new(retention),
            Some(bytes) => match closes_codec::decode(&bytes, retention) {
                Ok(store) => store,
                Err(e) => {
                    warn!(key, error = %e, "Closes ledger unreadable, starting from empty");
                    RollingStore::new(retention)
                }
            },
        })
    }

    /// Load the history ledger, self-healing corrupt state the same way.
    async fn load_history(&self) -> Result<HistoryLedger, PipelineError> {
        let retention = self.config.retention.history_entries;
        let key = &self.config.artifacts.history_key;
        let bytes = self
            .artifacts
            .read(key)
            .await
            .map_err(|e| PipelineError::Artifact(format!("read history: {e}")))?;

        Ok(match bytes {
            None => HistoryLedger::new(retention),
            Some(bytes) => match serde_json::from_slice::<Vec<HistoryEntry>>(&bytes) {
                Ok(entries) => HistoryLedger::from_entries(entries, retention),
                Err(e) => {
                    warn!(key, error = %e, "History unreadable, starting from empty");
                    HistoryLedger::new(retention)
                }
            },
        })
    }
}
