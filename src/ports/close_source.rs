//! Close Source Port - Daily Close Acquisition Interface
//!
//! One capability, two interchangeable strategies: a vendor quote API
//! (batched time-series requests) and an exchange bulk end-of-day file
//! (date-keyed archive download). The pipeline only ever sees this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::prices::PricePoint;
use crate::domain::symbol::Symbol;
use crate::error::SourceError;

/// How much trailing history a fetch should request.
///
/// The orchestrator picks `Seed` when the rolling store is empty or a
/// full backfill was requested; `Incremental` tops up an already-seeded
/// store. Sources free to ignore it (a bulk file always covers exactly
/// one trading day).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchWindow {
    /// Deep window, enough to seed a 200-span EMA (≥260 trading days).
    Seed,
    /// Short trailing window for day-to-day top-ups.
    Incremental,
}

/// Result of one acquisition pass over the universe.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Date-ascending close series per successfully fetched symbol.
    pub closes: HashMap<Symbol, Vec<PricePoint>>,
    /// Symbols that failed (skippable; they reduce the eligible count).
    pub failed: Vec<Symbol>,
}

impl FetchOutcome {
    /// Total price points across all fetched symbols.
    pub fn point_count(&self) -> usize {
        self.closes.values().map(Vec::len).sum()
    }

    /// Drain all points into a single iterator for store upsert.
    pub fn into_points(self) -> impl Iterator<Item = PricePoint> {
        self.closes.into_values().flatten()
    }
}

/// Trait for daily close-price providers.
#[async_trait]
pub trait CloseSource: Send + Sync + 'static {
    /// Fetch close series for the universe as of a calendar date.
    ///
    /// Individual symbol failures are reported in `FetchOutcome::failed`;
    /// an `Err` means the whole acquisition failed (rate-limit budget
    /// exhausted on every batch, no trading-day file within the lookback
    /// window) and the run must abort.
    async fn fetch_closes(
        &self,
        symbols: &[Symbol],
        as_of: NaiveDate,
        window: FetchWindow,
    ) -> Result<FetchOutcome, SourceError>;

    /// Short human-readable source name for logging.
    fn name(&self) -> &'static str;
}
