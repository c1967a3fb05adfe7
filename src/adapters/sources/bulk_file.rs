//! Bulk-File Source - Exchange End-of-Day Archive Download
//!
//! Builds the date-keyed archive URL for the exchange's historical
//! naming convention, downloads the ZIP, and parses the single
//! contained CSV filtered to the equity series and the configured
//! universe. Archives do not exist for weekends and holidays, so a
//! missing file steps the candidate date back one calendar day, up to
//! the lookback bound. Each run yields exactly one trading day of
//! closes; the rolling store accumulates history across runs.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::retry::RetryPolicy;
use crate::config::BulkFileConfig;
use crate::domain::prices::PricePoint;
use crate::domain::symbol::Symbol;
use crate::error::{PipelineError, SourceError};
use crate::ports::close_source::{CloseSource, FetchOutcome, FetchWindow};

/// Bulk end-of-day file close-price source.
pub struct BulkFileSource {
    http: Client,
    config: BulkFileConfig,
    retry: RetryPolicy,
}

impl BulkFileSource {
    pub fn from_config(config: BulkFileConfig, retry: RetryPolicy) -> Result<Self, PipelineError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            config,
            retry,
        })
    }

    /// Expand the URL template for one candidate date.
    ///
    /// `{year}` → `2025`, `{month}` → `JUN`, `{date}` → `05JUN2025`.
    fn archive_url(&self, date: NaiveDate) -> String {
        let month = date.format("%b").to_string().to_uppercase();
        let stamp = format!("{:02}{}{}", date.day(), month, date.year());
        self.config
            .archive_url_template
            .replace("{year}", &date.year().to_string())
            .replace("{month}", &month)
            .replace("{date}", &stamp)
    }

    /// Download one candidate archive.
    ///
    /// `Ok(None)` means the archive does not exist — a non-trading day,
    /// handled by the caller's lookback. Rate limits and server errors
    /// are transient so the retry policy re-attempts them.
    async fn try_download(&self, url: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| SourceError::Network(e.to_string()))?;
                Ok(Some(bytes.to_vec()))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited("HTTP 429".into())),
            status if status.is_server_error() => {
                Err(SourceError::Network(format!("server error: {status}")))
            }
            // 404/403 and friends: the exchange has no file for this date.
            status => {
                debug!(%status, url, "No archive at candidate URL");
                Ok(None)
            }
        }
    }

    /// Extract the single CSV from the ZIP and parse its rows.
    fn parse_archive(
        &self,
        bytes: &[u8],
        universe: &HashSet<&Symbol>,
    ) -> Result<HashMap<Symbol, PricePoint>, SourceError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SourceError::Malformed(format!("bad ZIP archive: {e}")))?;
        if archive.len() == 0 {
            return Err(SourceError::Malformed("empty ZIP archive".into()));
        }

        let mut csv_bytes = Vec::new();
        archive
            .by_index(0)
            .map_err(|e| SourceError::Malformed(format!("unreadable ZIP entry: {e}")))?
            .read_to_end(&mut csv_bytes)
            .map_err(|e| SourceError::Malformed(format!("truncated ZIP entry: {e}")))?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(csv_bytes.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| SourceError::Malformed(format!("bad CSV header: {e}")))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let (Some(sym_idx), Some(series_idx), Some(close_idx), Some(ts_idx)) = (
            column("SYMBOL"),
            column("SERIES"),
            column("CLOSE"),
            column("TIMESTAMP"),
        ) else {
            return Err(SourceError::Malformed(
                "archive CSV is missing SYMBOL/SERIES/CLOSE/TIMESTAMP columns".into(),
            ));
        };

        let mut out = HashMap::new();
        for record in reader.records() {
            // Individual bad rows are dropped, never fatal.
            let Ok(record) = record else { continue };
            let Some(series) = record.get(series_idx) else {
                continue;
            };
            if !series.eq_ignore_ascii_case(&self.config.series) {
                continue;
            }
            let Some(symbol) = record.get(sym_idx).and_then(Symbol::normalize) else {
                continue;
            };
            if !universe.contains(&symbol) {
                continue;
            }
            let Some(close) = record.get(close_idx).and_then(|c| c.parse::<f64>().ok()) else {
                continue;
            };
            let Some(date) = record
                .get(ts_idx)
                .and_then(|t| NaiveDate::parse_from_str(t, "%d-%b-%Y").ok())
            else {
                continue;
            };
            out.insert(
                symbol.clone(),
                PricePoint {
                    symbol,
                    date,
                    close,
                },
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl CloseSource for BulkFileSource {
    #[instrument(skip(self, symbols), fields(universe = symbols.len(), %as_of))]
    async fn fetch_closes(
        &self,
        symbols: &[Symbol],
        as_of: NaiveDate,
        _window: FetchWindow,
    ) -> Result<FetchOutcome, SourceError> {
        let universe: HashSet<&Symbol> = symbols.iter().collect();

        for offset in 0..=u64::from(self.config.lookback_days) {
            let candidate = as_of - Days::new(offset);
            let url = self.archive_url(candidate);

            let body = self
                .retry
                .run("bulk_archive", || self.try_download(&url))
                .await?;
            let Some(bytes) = body else {
                debug!(%candidate, "Not a trading day, stepping back");
                continue;
            };

            info!(%candidate, size = bytes.len(), "End-of-day archive resolved");
            let rows = self.parse_archive(&bytes, &universe)?;
            if rows.is_empty() {
                return Err(SourceError::AllSymbolsFailed(format!(
                    "archive for {candidate} contained no rows matching the universe"
                )));
            }

            let mut outcome = FetchOutcome::default();
            for symbol in symbols {
                match rows.get(symbol) {
                    Some(point) => {
                        outcome.closes.insert(symbol.clone(), vec![point.clone()]);
                    }
                    None => outcome.failed.push(symbol.clone()),
                }
            }
            if !outcome.failed.is_empty() {
                warn!(
                    missing = outcome.failed.len(),
                    "Universe symbols absent from the archive"
                );
            }
            return Ok(outcome);
        }

        Err(SourceError::NoTradingDayFile {
            as_of,
            lookback_days: self.config.lookback_days,
        })
    }

    fn name(&self) -> &'static str {
        "bulk_file"
    }
}
