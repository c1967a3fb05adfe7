//! Daily snapshot and the bounded history ledger.
//!
//! `DailySnapshot` is the transient "latest" artifact, overwritten every
//! run; `HistoryLedger` is the durable date-unique series of reduced
//! projections. JSON field names follow the dashboard's original wire
//! format (`dt`, `green_prob_5d`, `green_alert`, ...), so the downstream
//! consumer never notices the producer changed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Composite-score signal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Green,
    Watch,
    Caution,
    Red,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "GREEN"),
            Self::Watch => write!(f, "WATCH"),
            Self::Caution => write!(f, "CAUTION"),
            Self::Red => write!(f, "RED"),
        }
    }
}

/// Outlook alert level derived from the outlook probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    High,
    Med,
    Low,
}

/// Boolean trigger conditions feeding the outlook probability bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFlags {
    /// Breadth-50 thrust: pct_above_50 over the thrust threshold.
    pub p50_thrust: bool,
    /// Strong advance/decline ratio.
    pub ad_strong: bool,
    /// Breadth-200 improving: pct_above_200 over its floor.
    pub p200_improving: bool,
}

/// The full cross-sectional breadth snapshot for one trading date.
///
/// Created fresh each run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// Reference trading date (the quorum date).
    #[serde(rename = "dt")]
    pub trading_date: NaiveDate,
    /// Human-readable date, e.g. "05 Jun 2025 (Thursday)".
    pub date_pretty: String,
    pub signal: Signal,
    /// Composite score, 0..=4.
    pub score: u8,
    pub pct_above_20: f64,
    pub pct_above_50: f64,
    pub pct_above_200: f64,
    #[serde(rename = "adv")]
    pub advances: u32,
    #[serde(rename = "dec")]
    pub declines: u32,
    pub ad_ratio: f64,
    pub market_health_pct: f64,
    /// Short-horizon outlook probability, clamped to [5, 90].
    #[serde(rename = "green_prob_5d")]
    pub outlook_probability: f64,
    #[serde(rename = "green_alert")]
    pub alert_level: AlertLevel,
    pub headline: String,
    pub badge: String,
    pub flags: TriggerFlags,
    /// Eligible symbols that participated in this cross-section.
    pub universe_count: u32,
}

impl DailySnapshot {
    /// The reduced projection persisted into the history ledger.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            trading_date: self.trading_date,
            pct_above_50: self.pct_above_50,
            pct_above_200: self.pct_above_200,
            outlook_probability: self.outlook_probability,
            market_health_pct: self.market_health_pct,
        }
    }
}

/// Reduced snapshot projection stored in the history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "dt")]
    pub trading_date: NaiveDate,
    pub pct_above_50: f64,
    pub pct_above_200: f64,
    #[serde(rename = "green_prob_5d")]
    pub outlook_probability: f64,
    pub market_health_pct: f64,
}

/// Date-unique, date-ascending, bounded sequence of history entries.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    retention: usize,
}

impl HistoryLedger {
    /// Create an empty ledger with the given retention bound.
    pub fn new(retention: usize) -> Self {
        Self {
            entries: Vec::new(),
            retention,
        }
    }

    /// Build a ledger from previously persisted entries.
    ///
    /// Normalizes whatever was on disk: sorts ascending, drops duplicate
    /// dates (last occurrence wins), truncates to the retention bound.
    pub fn from_entries(mut entries: Vec<HistoryEntry>, retention: usize) -> Self {
        entries.sort_by_key(|e| e.trading_date);
        entries.dedup_by_key(|e| e.trading_date);
        let mut ledger = Self { entries, retention };
        ledger.truncate();
        ledger
    }

    /// Insert-or-replace keyed by trading date, then re-sort and truncate.
    ///
    /// This is what keeps same-day re-runs idempotent in the persisted
    /// series: the new entry replaces the old one instead of appending.
    pub fn upsert(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.trading_date != entry.trading_date);
        self.entries.push(entry);
        self.entries.sort_by_key(|e| e.trading_date);
        self.truncate();
    }

    /// Keep only the most recent `retention` entries.
    fn truncate(&mut self) {
        if self.entries.len() > self.retention {
            let excess = self.entries.len() - self.retention;
            self.entries.drain(..excess);
        }
    }

    /// Date-ascending view of the entries.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
