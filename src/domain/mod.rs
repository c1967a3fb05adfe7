//! Domain layer - Core breadth-indicator logic.
//!
//! Pure computation over close prices: symbol normalization, the rolling
//! close ledger, exponential moving averages, cross-sectional breadth
//! statistics, and the snapshot/history records fed to the dashboard.
//! No I/O in this module (hexagonal architecture inner ring).

pub mod breadth;
pub mod ema;
pub mod prices;
pub mod snapshot;
pub mod symbol;

// Re-export core types for convenience
pub use breadth::MetricsEngine;
pub use prices::{PricePoint, RollingStore};
pub use snapshot::{DailySnapshot, HistoryEntry, HistoryLedger};
pub use symbol::Symbol;
