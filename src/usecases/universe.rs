//! Universe Loader - Symbol List Parsing and Normalization
//!
//! Reads the tabular symbol resource, finds the ticker column by
//! header name (case-insensitive), normalizes each entry, and
//! deduplicates preserving first-seen order. A universe below the
//! configured minimum size is rejected: breadth over a handful of
//! symbols is noise, not a market signal.

use tracing::{debug, info};

use crate::config::UniverseConfig;
use crate::domain::symbol::{dedup_ordered, Symbol};
use crate::error::PipelineError;

/// Parse the symbol universe from raw CSV bytes.
///
/// `#`-prefixed comment lines are skipped; extra columns are ignored.
///
/// # Errors
/// `PipelineError::Configuration` when the symbol column is missing or
/// the normalized universe is smaller than `config.min_size`.
pub fn parse_universe(bytes: &[u8], config: &UniverseConfig) -> Result<Vec<Symbol>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Configuration(format!("unreadable symbol list header: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(&config.symbol_column))
        .ok_or_else(|| {
            PipelineError::Configuration(format!(
                "symbol list has no '{}' column (found: {})",
                config.symbol_column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut raw_count = 0usize;
    let symbols = reader
        .records()
        .filter_map(|record| {
            let record = record.ok()?;
            raw_count += 1;
            record.get(column).and_then(Symbol::normalize)
        })
        .collect::<Vec<_>>();
    let universe = dedup_ordered(symbols);

    debug!(
        rows = raw_count,
        unique = universe.len(),
        "Symbol list parsed"
    );

    if universe.len() < config.min_size {
        return Err(PipelineError::Configuration(format!(
            "universe too small for meaningful breadth: {} symbols, need at least {}",
            universe.len(),
            config.min_size
        )));
    }

    info!(symbols = universe.len(), "Universe loaded");
    Ok(universe)
}

/// Load the universe from the configured file path.
pub async fn load_universe(config: &UniverseConfig) -> Result<Vec<Symbol>, PipelineError> {
    let bytes = tokio::fs::read(&config.path).await.map_err(|e| {
        PipelineError::Configuration(format!("cannot read symbol list {}: {e}", config.path))
    })?;
    parse_universe(&bytes, config)
}
