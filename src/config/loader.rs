//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        source = ?config.source.kind,
        universe = %config.universe.path,
        min_universe = config.universe.min_size,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    // Universe validation
    anyhow::ensure!(
        !config.universe.path.is_empty(),
        "universe.path must not be empty"
    );
    anyhow::ensure!(
        !config.universe.symbol_column.is_empty(),
        "universe.symbol_column must not be empty"
    );
    anyhow::ensure!(
        config.universe.min_size > 0,
        "universe.min_size must be positive"
    );

    // Source validation
    anyhow::ensure!(
        !config.source.quote.base_url.is_empty(),
        "source.quote.base_url must not be empty"
    );
    anyhow::ensure!(
        config.source.quote.batch_size > 0 && config.source.quote.batch_size <= 120,
        "source.quote.batch_size must be in (0, 120], got {}",
        config.source.quote.batch_size
    );
    anyhow::ensure!(
        config.source.quote.seed_output_size >= 260,
        "source.quote.seed_output_size must be at least 260 to seed a 200-span EMA, got {}",
        config.source.quote.seed_output_size
    );
    anyhow::ensure!(
        config.source.quote.pace_every > 0,
        "source.quote.pace_every must be positive"
    );
    anyhow::ensure!(
        !config.source.bulk.archive_url_template.is_empty(),
        "source.bulk.archive_url_template must not be empty"
    );
    anyhow::ensure!(
        config.source.bulk.lookback_days > 0,
        "source.bulk.lookback_days must be positive"
    );

    // Retry validation
    anyhow::ensure!(
        config.retry.max_attempts > 0,
        "retry.max_attempts must be positive"
    );

    // Retention validation
    anyhow::ensure!(
        config.retention.close_points >= config.metrics.min_history,
        "retention.close_points ({}) must cover metrics.min_history ({})",
        config.retention.close_points,
        config.metrics.min_history
    );
    anyhow::ensure!(
        config.retention.history_entries > 0,
        "retention.history_entries must be positive"
    );

    // Metrics validation
    anyhow::ensure!(
        config.metrics.min_history >= 2,
        "metrics.min_history must be at least 2 (advance/decline needs a prior close)"
    );
    anyhow::ensure!(
        !config.metrics.bands.is_empty(),
        "metrics.bands must not be empty"
    );
    let weights = &config.metrics.health;
    anyhow::ensure!(
        weights.pct50_weight >= 0.0 && weights.pct200_weight >= 0.0,
        "metrics.health weights must be non-negative"
    );
    let outlook = &config.metrics.outlook;
    anyhow::ensure!(
        outlook.floor <= outlook.ceiling,
        "metrics.outlook.floor ({}) must not exceed ceiling ({})",
        outlook.floor,
        outlook.ceiling
    );

    Ok(())
}
