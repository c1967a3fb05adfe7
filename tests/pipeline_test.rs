//! Integration Tests - End-to-end Pipeline Runs
//!
//! Exercises the orchestrator against a mocked close source and an
//! in-memory artifact store. Uses mockall for the source port and
//! tokio::test for async tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use mockall::mock;

use nse_breadth_pipeline::config::{
    AppConfig, ArtifactConfig, BulkFileConfig, JobConfig, QuoteApiConfig, RetentionConfig,
    RetryConfig, SourceConfig, SourceKind, UniverseConfig,
};
use nse_breadth_pipeline::domain::breadth::MetricsConfig;
use nse_breadth_pipeline::domain::prices::PricePoint;
use nse_breadth_pipeline::domain::symbol::Symbol;
use nse_breadth_pipeline::error::{PipelineError, SourceError};
use nse_breadth_pipeline::ports::artifact_store::ArtifactStore;
use nse_breadth_pipeline::ports::close_source::{CloseSource, FetchOutcome, FetchWindow};
use nse_breadth_pipeline::usecases::{Pipeline, RunMode};

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait]
    impl CloseSource for Source {
        async fn fetch_closes(
            &self,
            symbols: &[Symbol],
            as_of: NaiveDate,
            window: FetchWindow,
        ) -> Result<FetchOutcome, SourceError>;

        fn name(&self) -> &'static str;
    }
}

/// In-memory artifact store: enough to observe what a run persisted.
#[derive(Default)]
struct MemStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, bytes: &[u8]) {
        self.map.lock().unwrap().insert(key.into(), bytes.to_vec());
    }
}

#[async_trait]
impl ArtifactStore for MemStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.put(key, bytes);
        Ok(())
    }
}

// ---- Fixtures ----

fn sym(s: &str) -> Symbol {
    Symbol::normalize(s).unwrap()
}

/// Write a three-symbol universe CSV and return a config pointing at it.
fn test_config(tag: &str) -> AppConfig {
    let dir = std::env::temp_dir().join(format!("breadth-it-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let universe_path = dir.join("symbols.csv");
    std::fs::write(&universe_path, "symbol,name\nTCS,Tata\nINFY,Infosys\nRELIANCE,Reliance\n")
        .unwrap();

    AppConfig {
        job: JobConfig::default(),
        universe: UniverseConfig {
            path: universe_path.to_str().unwrap().to_string(),
            symbol_column: "symbol".into(),
            min_size: 3,
        },
        source: SourceConfig {
            kind: SourceKind::QuoteApi,
            quote: QuoteApiConfig::default(),
            bulk: BulkFileConfig::default(),
        },
        retry: RetryConfig::default(),
        retention: RetentionConfig::default(),
        metrics: MetricsConfig::default(),
        artifacts: ArtifactConfig::default(),
    }
}

/// A 250-point rising series ending 2025-06-30 for each universe symbol.
fn full_outcome() -> FetchOutcome {
    let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let mut outcome = FetchOutcome::default();
    for (name, base) in [("TCS", 3000.0), ("INFY", 1400.0), ("RELIANCE", 2500.0)] {
        let symbol = sym(name);
        let points: Vec<PricePoint> = (0..250)
            .map(|i| PricePoint {
                symbol: symbol.clone(),
                date: end - Days::new(249 - i),
                close: base + i as f64,
            })
            .collect();
        outcome.closes.insert(symbol, points);
    }
    outcome
}

fn pipeline_with(source: MockSource, config: AppConfig) -> (Pipeline, Arc<MemStore>) {
    let artifacts = Arc::new(MemStore::default());
    let store: Arc<dyn ArtifactStore> = Arc::clone(&artifacts) as Arc<dyn ArtifactStore>;
    let pipeline = Pipeline::new(Arc::new(source), store, config);
    (pipeline, artifacts)
}

// ---- Integration Tests ----

#[tokio::test]
async fn same_day_rerun_is_idempotent() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .times(2)
        .returning(|_, _, _| Ok(full_outcome()));

    let (pipeline, artifacts) = pipeline_with(source, test_config("idempotent"));

    let first = pipeline.run(RunMode::Incremental).await.unwrap();
    let latest_first = artifacts.get("latest.json").unwrap();
    let history_first = artifacts.get("history.json").unwrap();

    let second = pipeline.run(RunMode::Incremental).await.unwrap();
    let latest_second = artifacts.get("latest.json").unwrap();
    let history_second = artifacts.get("history.json").unwrap();

    assert_eq!(latest_first, latest_second);
    assert_eq!(history_first, history_second);
    assert_eq!(first.history_len, 1);
    assert_eq!(second.history_len, 1);
    // Nothing new was inserted the second time around.
    assert_eq!(second.points_inserted, 0);
    assert_eq!(first.snapshot, second.snapshot);
}

#[tokio::test]
async fn first_run_requests_seed_window_then_incremental() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .times(1)
        .withf(|_, _, window| *window == FetchWindow::Seed)
        .returning(|_, _, _| Ok(full_outcome()));
    source
        .expect_fetch_closes()
        .times(1)
        .withf(|_, _, window| *window == FetchWindow::Incremental)
        .returning(|_, _, _| Ok(full_outcome()));

    let (pipeline, _artifacts) = pipeline_with(source, test_config("window"));
    pipeline.run(RunMode::Incremental).await.unwrap();
    pipeline.run(RunMode::Incremental).await.unwrap();
}

#[tokio::test]
async fn backfill_mode_reseeds_even_with_stored_state() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .times(2)
        .withf(|_, _, window| *window == FetchWindow::Seed)
        .returning(|_, _, _| Ok(full_outcome()));

    let (pipeline, _artifacts) = pipeline_with(source, test_config("backfill"));
    pipeline.run(RunMode::Backfill).await.unwrap();
    pipeline.run(RunMode::Backfill).await.unwrap();
}

#[tokio::test]
async fn all_symbols_failed_aborts_without_artifacts() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .returning(|_, _, _| Err(SourceError::AllSymbolsFailed("none returned data".into())));

    let (pipeline, artifacts) = pipeline_with(source, test_config("allfailed"));
    let err = pipeline.run(RunMode::Incremental).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Source(SourceError::AllSymbolsFailed(_))
    ));
    assert!(artifacts.get("latest.json").is_none());
    assert!(artifacts.get("history.json").is_none());
    assert!(artifacts.get("closes.csv.gz").is_none());
}

#[tokio::test]
async fn short_history_persists_closes_but_no_snapshot() {
    // 20 points per symbol: well under the 210-point gate. The closes
    // ledger must still be persisted (ingestion is valuable on its own),
    // but latest/history must not be written.
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source.expect_fetch_closes().returning(|_, _, _| {
        let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut outcome = FetchOutcome::default();
        for name in ["TCS", "INFY", "RELIANCE"] {
            let symbol = sym(name);
            let points: Vec<PricePoint> = (0..20)
                .map(|i| PricePoint {
                    symbol: symbol.clone(),
                    date: end - Days::new(19 - i),
                    close: 100.0 + i as f64,
                })
                .collect();
            outcome.closes.insert(symbol, points);
        }
        Ok(outcome)
    });

    let (pipeline, artifacts) = pipeline_with(source, test_config("shorthistory"));
    let err = pipeline.run(RunMode::Incremental).await.unwrap_err();

    assert!(matches!(err, PipelineError::InsufficientHistory { .. }));
    assert!(artifacts.get("closes.csv.gz").is_some());
    assert!(artifacts.get("latest.json").is_none());
    assert!(artifacts.get("history.json").is_none());
}

#[tokio::test]
async fn corrupt_history_self_heals() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .returning(|_, _, _| Ok(full_outcome()));

    let (pipeline, artifacts) = pipeline_with(source, test_config("corrupt"));
    artifacts.put("history.json", b"{ not json at all");
    artifacts.put("closes.csv.gz", b"also garbage");

    let report = pipeline.run(RunMode::Incremental).await.unwrap();
    assert_eq!(report.history_len, 1);

    // The rewritten artifacts are valid again.
    let history: serde_json::Value =
        serde_json::from_slice(&artifacts.get("history.json").unwrap()).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_symbols_reduce_the_cross_section() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source.expect_fetch_closes().returning(|_, _, _| {
        let mut outcome = full_outcome();
        outcome.closes.remove(&sym("RELIANCE"));
        outcome.failed.push(sym("RELIANCE"));
        Ok(outcome)
    });

    let (pipeline, _artifacts) = pipeline_with(source, test_config("partial"));
    let report = pipeline.run(RunMode::Incremental).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.snapshot.universe_count, 2);
}

#[tokio::test]
async fn latest_snapshot_uses_dashboard_wire_format() {
    let mut source = MockSource::new();
    source.expect_name().return_const("mock");
    source
        .expect_fetch_closes()
        .returning(|_, _, _| Ok(full_outcome()));

    let (pipeline, artifacts) = pipeline_with(source, test_config("wire"));
    pipeline.run(RunMode::Incremental).await.unwrap();

    let latest: serde_json::Value =
        serde_json::from_slice(&artifacts.get("latest.json").unwrap()).unwrap();
    assert_eq!(latest["dt"], "2025-06-30");
    assert_eq!(latest["universe_count"], 3);
    // All series rise, so the composite must be fully green.
    assert_eq!(latest["signal"], "GREEN");
    assert_eq!(latest["score"], 4);
    for field in [
        "date_pretty",
        "pct_above_20",
        "pct_above_50",
        "pct_above_200",
        "adv",
        "dec",
        "ad_ratio",
        "market_health_pct",
        "green_prob_5d",
        "green_alert",
        "headline",
        "badge",
        "flags",
    ] {
        assert!(latest.get(field).is_some(), "missing field {field}");
    }
}
