//! Error Types - Structured Failure Classification
//!
//! Two layers of errors, matching the pipeline's two failure surfaces:
//! - `SourceError`: raised at the source-adapter boundary, classified as
//!   transient (retryable) or fatal so the retry policy never has to
//!   string-match vendor error text.
//! - `PipelineError`: run-level failures that abort before the snapshot
//!   and history artifacts are written.
//!
//! Corrupt persisted state (unreadable history/closes files) is deliberately
//! NOT an error: the pipeline warns and continues from empty.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by close-price source adapters.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Vendor rate limit hit (HTTP 429 or an error envelope with code 429).
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    /// Network-level failure (timeout, connect, 5xx).
    #[error("network error: {0}")]
    Network(String),

    /// Response arrived but could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No bulk end-of-day archive exists within the lookback window.
    #[error("no end-of-day archive found within {lookback_days} days of {as_of}")]
    NoTradingDayFile {
        as_of: NaiveDate,
        lookback_days: u32,
    },

    /// Every symbol in the universe failed to fetch.
    #[error("all symbol fetches failed: {0}")]
    AllSymbolsFailed(String),
}

impl SourceError {
    /// Whether the retry policy should attempt this error again.
    ///
    /// Rate limits and network failures are transient; everything else
    /// escalates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_))
    }
}

/// Run-level errors. Any of these aborts the run with a non-zero exit,
/// without writing the `latest` or `history` artifacts.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing required column / API key / universe too small.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A source adapter failed fatally (after retries / lookback).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No symbol in the universe has enough stored history for a stable
    /// long-span EMA. Self-resolves only by running again on later days.
    #[error(
        "no symbol has the {required} closes needed for breadth \
         (universe of {universe}); re-run after more trading days accrue"
    )]
    InsufficientHistory { required: usize, universe: usize },

    /// The artifact store failed to read or write.
    #[error("artifact store error: {0}")]
    Artifact(String),
}
