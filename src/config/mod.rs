//! Configuration Module - TOML-based Pipeline Configuration
//!
//! Loads and validates configuration from `config.toml`. File paths,
//! API endpoints, batch/pacing/retry knobs, retention bounds, and every
//! scoring constant are externalized here - nothing is hardcoded in the
//! domain layer. The vendor API key alone comes from the environment.

pub mod loader;

use serde::Deserialize;

use crate::domain::breadth::MetricsConfig;

/// Top-level pipeline configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the run begins.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Job identity and logging.
    #[serde(default)]
    pub job: JobConfig,
    /// Symbol universe resource.
    pub universe: UniverseConfig,
    /// Close-price source selection and per-variant settings.
    pub source: SourceConfig,
    /// Retry/backoff policy shared by the source adapters.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Retention bounds for the rolling store and history ledger.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Metrics engine thresholds, weights, and bands.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Artifact store location and keys.
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

/// Job identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Human-readable job name.
    #[serde(default = "default_job_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: default_job_name(),
            log_level: default_log_level(),
        }
    }
}

/// Symbol universe configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    /// Path to the CSV symbol list.
    pub path: String,
    /// Header name of the ticker column (matched case-insensitively).
    #[serde(default = "default_symbol_column")]
    pub symbol_column: String,
    /// Minimum normalized universe size; breadth over fewer symbols is
    /// not meaningful.
    #[serde(default = "default_min_universe")]
    pub min_size: usize,
}

/// Which close-price source strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    QuoteApi,
    BulkFile,
}

/// Close-price source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Active strategy.
    pub kind: SourceKind,
    /// Quote-API variant settings.
    #[serde(default)]
    pub quote: QuoteApiConfig,
    /// Bulk-file variant settings.
    #[serde(default)]
    pub bulk: BulkFileConfig,
}

/// Quote-API source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteApiConfig {
    /// Time-series endpoint base URL.
    #[serde(default = "default_quote_base_url")]
    pub base_url: String,
    /// Vendor exchange code appended to each symbol.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Env var holding the API key. Never stored in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Symbols per batched call (vendor documents up to ~120).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Candles requested in Seed mode (enough for a 200-span EMA).
    #[serde(default = "default_seed_output_size")]
    pub seed_output_size: u32,
    /// Candles requested in Incremental mode.
    #[serde(default = "default_incremental_output_size")]
    pub incremental_output_size: u32,
    /// A pacing delay is inserted after every N calls.
    #[serde(default = "default_pace_every")]
    pub pace_every: u32,
    /// Pacing delay in milliseconds.
    #[serde(default = "default_pace_delay_ms")]
    pub pace_delay_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QuoteApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_quote_base_url(),
            exchange: default_exchange(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            seed_output_size: default_seed_output_size(),
            incremental_output_size: default_incremental_output_size(),
            pace_every: default_pace_every(),
            pace_delay_ms: default_pace_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Bulk end-of-day file source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFileConfig {
    /// Archive URL template with `{year}`, `{month}` (upper `%b`) and
    /// `{date}` (upper `%d%b%Y`) placeholders.
    #[serde(default = "default_archive_url_template")]
    pub archive_url_template: String,
    /// Calendar days to step back looking for the latest trading day.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Security series to keep from the archive (equities).
    #[serde(default = "default_series")]
    pub series: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BulkFileConfig {
    fn default() -> Self {
        Self {
            archive_url_template: default_archive_url_template(),
            lookback_days: default_lookback_days(),
            series: default_series(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry/backoff policy settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per request (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay, doubled on each retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Retention bounds for durable state.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Close points kept per symbol (~5 trading years).
    #[serde(default = "default_close_points")]
    pub close_points: usize,
    /// History ledger entries kept.
    #[serde(default = "default_history_entries")]
    pub history_entries: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            close_points: default_close_points(),
            history_entries: default_history_entries(),
        }
    }
}

/// Artifact store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Directory backing the filesystem artifact store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Key for the latest snapshot JSON.
    #[serde(default = "default_latest_key")]
    pub latest_key: String,
    /// Key for the history series JSON.
    #[serde(default = "default_history_key")]
    pub history_key: String,
    /// Key for the gzip-compressed closes ledger.
    #[serde(default = "default_closes_key")]
    pub closes_key: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            latest_key: default_latest_key(),
            history_key: default_history_key(),
            closes_key: default_closes_key(),
        }
    }
}

// Default value functions for serde

fn default_job_name() -> String {
    "nse-breadth-pipeline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_symbol_column() -> String {
    "symbol".to_string()
}

fn default_min_universe() -> usize {
    50
}

fn default_quote_base_url() -> String {
    "https://api.twelvedata.com/time_series".to_string()
}

fn default_exchange() -> String {
    "XNSE".to_string()
}

fn default_api_key_env() -> String {
    "TWELVE_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    120
}

fn default_seed_output_size() -> u32 {
    260
}

fn default_incremental_output_size() -> u32 {
    30
}

fn default_pace_every() -> u32 {
    8
}

fn default_pace_delay_ms() -> u64 {
    60_000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_archive_url_template() -> String {
    "https://archives.nseindia.com/content/historical/EQUITIES/{year}/{month}/cm{date}bhav.csv.zip"
        .to_string()
}

fn default_lookback_days() -> u32 {
    20
}

fn default_series() -> String {
    "EQ".to_string()
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_close_points() -> usize {
    1400
}

fn default_history_entries() -> usize {
    800
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_latest_key() -> String {
    "latest.json".to_string()
}

fn default_history_key() -> String {
    "history.json".to_string()
}

fn default_closes_key() -> String {
    "closes.csv.gz".to_string()
}
