//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the breadth domain maintains its
//! mathematical invariants across random inputs.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use nse_breadth_pipeline::domain::breadth::{MetricsConfig, MetricsEngine};
use nse_breadth_pipeline::domain::ema::ema_series;
use nse_breadth_pipeline::domain::prices::{PricePoint, RollingStore};
use nse_breadth_pipeline::domain::snapshot::{HistoryEntry, HistoryLedger, Signal};
use nse_breadth_pipeline::domain::symbol::Symbol;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// ── EMA Properties ──────────────────────────────────────────

proptest! {
    /// An EMA is a convex combination of observations, so every output
    /// must stay inside the range of the inputs seen so far.
    #[test]
    fn ema_stays_within_input_range(
        values in prop::collection::vec(1.0f64..10_000.0, 1..400),
        span in 2usize..250,
    ) {
        let series = ema_series(&values, span);
        prop_assert_eq!(series.len(), values.len());
        let mut lo = values[0];
        let mut hi = values[0];
        for (value, ema) in values.iter().zip(&series) {
            lo = lo.min(*value);
            hi = hi.max(*value);
            prop_assert!(
                *ema >= lo - 1e-9 && *ema <= hi + 1e-9,
                "EMA {ema} escaped observed range [{lo}, {hi}]"
            );
        }
    }

    /// A constant series is a fixed point of the recursion.
    #[test]
    fn ema_of_constant_series_is_constant(
        level in 1.0f64..10_000.0,
        len in 1usize..300,
        span in 2usize..250,
    ) {
        let values = vec![level; len];
        let series = ema_series(&values, span);
        for ema in series {
            prop_assert!(
                (ema - level).abs() < 1e-9,
                "constant input {level} produced EMA {ema}"
            );
        }
    }
}

// ── Breadth Metrics Properties ──────────────────────────────

/// Build a store of `n` aligned random-walk series, each long enough to
/// clear the minimum-history gate.
fn random_walk_store(seeds: &[f64], steps: &[f64]) -> RollingStore {
    let mut store = RollingStore::new(1400);
    let end = base_date() + Days::new(300);
    for (i, seed) in seeds.iter().enumerate() {
        let symbol = Symbol::normalize(&format!("SYM{i}")).unwrap();
        let mut close = *seed;
        let points: Vec<PricePoint> = (0..260usize)
            .map(|d| {
                close = (close + steps[(i + d) % steps.len()]).max(1.0);
                PricePoint {
                    symbol: symbol.clone(),
                    date: end - Days::new(259 - d as u64),
                    close,
                }
            })
            .collect();
        store.upsert(points);
    }
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Percentages, health, score, and outlook must all land in their
    /// documented ranges no matter what the closes do.
    #[test]
    fn snapshot_fields_stay_in_range(
        seeds in prop::collection::vec(50.0f64..5000.0, 3..12),
        steps in prop::collection::vec(-20.0f64..20.0, 8..32),
    ) {
        let store = random_walk_store(&seeds, &steps);
        let engine = MetricsEngine::new(MetricsConfig::default());
        let snap = engine.compute(&store).unwrap();

        for pct in [snap.pct_above_20, snap.pct_above_50, snap.pct_above_200] {
            prop_assert!((0.0..=100.0).contains(&pct), "percentage {pct} out of range");
        }
        prop_assert!(
            (0.0..=100.0).contains(&snap.market_health_pct),
            "health {} out of range",
            snap.market_health_pct
        );
        prop_assert!(snap.score <= 4, "score {} out of range", snap.score);
        prop_assert!(
            (5.0..=90.0).contains(&snap.outlook_probability),
            "outlook probability {} escaped its clamp",
            snap.outlook_probability
        );
        prop_assert!(
            snap.ad_ratio.is_finite() && snap.ad_ratio >= 0.0,
            "ad_ratio {} not a finite non-negative number",
            snap.ad_ratio
        );
        prop_assert!(snap.advances + snap.declines <= snap.universe_count);
    }

    /// The signal is a pure function of the score.
    #[test]
    fn signal_matches_score(
        seeds in prop::collection::vec(50.0f64..5000.0, 3..10),
        steps in prop::collection::vec(-15.0f64..15.0, 8..24),
    ) {
        let store = random_walk_store(&seeds, &steps);
        let engine = MetricsEngine::new(MetricsConfig::default());
        let snap = engine.compute(&store).unwrap();

        let expected = match snap.score {
            4 => Signal::Green,
            3 => Signal::Watch,
            2 => Signal::Caution,
            _ => Signal::Red,
        };
        prop_assert_eq!(snap.signal, expected);
    }
}

// ── Retention Properties ────────────────────────────────────

proptest! {
    /// The rolling store never holds more than `retention` points per
    /// symbol, and always keeps the newest ones.
    #[test]
    fn rolling_store_retention_bound(
        retention in 1usize..200,
        count in 1usize..400,
    ) {
        let symbol = Symbol::normalize("RELIANCE").unwrap();
        let mut store = RollingStore::new(retention);
        let points: Vec<PricePoint> = (0..count)
            .map(|i| PricePoint {
                symbol: symbol.clone(),
                date: base_date() + Days::new(i as u64),
                close: i as f64 + 1.0,
            })
            .collect();
        store.upsert(points);

        let kept = store.read(&symbol);
        prop_assert_eq!(kept.len(), count.min(retention));
        // The newest point always survives pruning.
        prop_assert_eq!(
            kept.last().unwrap().date,
            base_date() + Days::new(count as u64 - 1)
        );
    }

    /// The history ledger is bounded and stays date-sorted.
    #[test]
    fn history_ledger_retention_and_order(
        retention in 1usize..100,
        count in 1usize..300,
    ) {
        let mut ledger = HistoryLedger::new(retention);
        for i in 0..count {
            ledger.upsert(HistoryEntry {
                trading_date: base_date() + Days::new(i as u64),
                pct_above_50: 50.0,
                pct_above_200: 50.0,
                outlook_probability: 45.0,
                market_health_pct: 50.0,
            });
        }
        prop_assert_eq!(ledger.len(), count.min(retention));
        let entries = ledger.entries();
        for pair in entries.windows(2) {
            prop_assert!(pair[0].trading_date < pair[1].trading_date);
        }
        // Newest entry is never the one evicted.
        prop_assert_eq!(
            entries.last().unwrap().trading_date,
            base_date() + Days::new(count as u64 - 1)
        );
    }
}

// ── Symbol Properties ───────────────────────────────────────

proptest! {
    /// Normalization is idempotent: feeding a normalized symbol back in
    /// yields the same symbol.
    #[test]
    fn symbol_normalization_is_idempotent(raw in "[A-Za-z][A-Za-z0-9&-]{0,11}") {
        if let Some(symbol) = Symbol::normalize(&raw) {
            let again = Symbol::normalize(symbol.as_str());
            prop_assert_eq!(Some(symbol), again);
        }
    }
}
