//! Price points and the rolling close store.
//!
//! The store is the pipeline's only long-lived price state: a per-symbol,
//! date-ascending ledger of daily closes, bounded by a retention cap.
//! Upsert is keyed on `(symbol, date)` and silently skips duplicates, so
//! re-running the same trading day twice is a no-op here.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// A single daily close observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub close: f64,
}

/// One `(date, close)` entry inside a symbol's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Bounded per-symbol ledger of daily closes.
///
/// Invariants:
/// - dates strictly ascending within each symbol's ledger
/// - at most one close per `(symbol, date)`
/// - at most `retention` points per symbol; pruning drops the oldest
#[derive(Debug, Clone, Default)]
pub struct RollingStore {
    ledgers: BTreeMap<Symbol, Vec<ClosePoint>>,
    retention: usize,
}

impl RollingStore {
    /// Create an empty store with the given per-symbol retention cap.
    pub fn new(retention: usize) -> Self {
        Self {
            ledgers: BTreeMap::new(),
            retention,
        }
    }

    /// Merge new price points into the ledgers.
    ///
    /// Existing `(symbol, date)` pairs are left untouched. Always prunes
    /// afterwards so the store stays bounded regardless of growth pattern.
    /// Returns the number of points actually inserted.
    pub fn upsert(&mut self, points: impl IntoIterator<Item = PricePoint>) -> usize {
        let mut inserted = 0;
        for point in points {
            let ledger = self.ledgers.entry(point.symbol).or_default();
            match ledger.binary_search_by_key(&point.date, |p| p.date) {
                Ok(_) => {} // already present, keep the original
                Err(pos) => {
                    ledger.insert(
                        pos,
                        ClosePoint {
                            date: point.date,
                            close: point.close,
                        },
                    );
                    inserted += 1;
                }
            }
        }
        self.prune();
        inserted
    }

    /// Drop all but the most recent `retention` points per symbol.
    pub fn prune(&mut self) {
        for ledger in self.ledgers.values_mut() {
            if ledger.len() > self.retention {
                let excess = ledger.len() - self.retention;
                ledger.drain(..excess);
            }
        }
    }

    /// Date-ascending closes for one symbol (empty slice if unknown).
    pub fn read(&self, symbol: &Symbol) -> &[ClosePoint] {
        self.ledgers.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Iterate over `(symbol, ledger)` pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &[ClosePoint])> {
        self.ledgers.iter().map(|(s, l)| (s, l.as_slice()))
    }

    /// Number of symbols with at least one stored close.
    pub fn symbol_count(&self) -> usize {
        self.ledgers.len()
    }

    /// Total stored points across all symbols.
    pub fn point_count(&self) -> usize {
        self.ledgers.values().map(Vec::len).sum()
    }

    /// Whether the store holds no data at all.
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    /// Per-symbol retention cap.
    pub fn retention(&self) -> usize {
        self.retention
    }
}
