//! Quote-API Source - Batched Vendor Time-Series Fetch
//!
//! Requests daily close candles for the universe in symbol batches
//! (the vendor documents up to ~120 symbols per call). Transient
//! failures (HTTP 429, 5xx, timeouts, error envelopes carrying code
//! 429) are retried with backoff; a batch that exhausts its budget
//! marks its symbols as failed but does not abort the run. A fixed
//! pacing delay is inserted every N calls to stay under the vendor's
//! per-minute credit limit.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::retry::RetryPolicy;
use crate::config::QuoteApiConfig;
use crate::domain::prices::PricePoint;
use crate::domain::symbol::Symbol;
use crate::error::{PipelineError, SourceError};
use crate::ports::close_source::{CloseSource, FetchOutcome, FetchWindow};

/// One candle row as the vendor ships it: every field is a string.
#[derive(Debug, Deserialize)]
struct CandleRow {
    datetime: String,
    close: String,
}

/// A per-symbol time-series payload.
#[derive(Debug, Deserialize)]
struct SeriesPayload {
    values: Vec<CandleRow>,
}

/// Vendor error envelope: `{"code": 429, "status": "error", "message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    code: Option<i64>,
    status: Option<String>,
    message: Option<String>,
}

impl ErrorEnvelope {
    fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

/// Quote-API close-price source.
pub struct QuoteApiSource {
    http: Client,
    config: QuoteApiConfig,
    api_key: String,
    retry: RetryPolicy,
}

impl QuoteApiSource {
    /// Build the source, reading the API key from the configured env var.
    ///
    /// # Errors
    /// `PipelineError::Configuration` when the key is absent — caught
    /// before any fetch is attempted.
    pub fn from_config(config: QuoteApiConfig, retry: RetryPolicy) -> Result<Self, PipelineError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PipelineError::Configuration(format!(
                "missing API key: set the {} environment variable",
                config.api_key_env
            ))
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            config,
            api_key,
            retry,
        })
    }

    /// Fetch one symbol batch. Transient failures surface as transient
    /// `SourceError`s so the retry policy can act on them.
    async fn fetch_batch(
        &self,
        batch: &[Symbol],
        output_size: u32,
    ) -> Result<HashMap<Symbol, Vec<PricePoint>>, SourceError> {
        let sym_param = batch
            .iter()
            .map(|s| format!("{s}:{}", self.config.exchange))
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("symbol", sym_param.as_str()),
                ("interval", "1day"),
                ("outputsize", &output_size.to_string()),
                ("order", "asc"),
                ("apikey", &self.api_key),
                ("format", "JSON"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SourceError::RateLimited("HTTP 429".into()));
            }
            status if status.is_server_error() => {
                return Err(SourceError::Network(format!("server error: {status}")));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Malformed(format!("API error {status}: {body}")));
            }
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("invalid JSON: {e}")))?;

        // A top-level error envelope fails the whole batch; code 429
        // (credit limit) is the transient case.
        if let Ok(envelope) = serde_json::from_value::<ErrorEnvelope>(body.clone()) {
            if envelope.is_error() {
                let message = envelope.message.unwrap_or_else(|| "unknown".into());
                return Err(if envelope.code == Some(429) {
                    SourceError::RateLimited(message)
                } else {
                    SourceError::Malformed(message)
                });
            }
        }

        Ok(self.parse_batch(batch, &body))
    }

    /// Normalize a batch response into per-symbol close series.
    ///
    /// Batch responses are keyed by `SYMBOL:EXCHANGE`; a single-symbol
    /// request returns the payload unkeyed. Per-symbol error envelopes
    /// and rows that fail coercion are dropped, not fatal.
    fn parse_batch(
        &self,
        batch: &[Symbol],
        body: &serde_json::Value,
    ) -> HashMap<Symbol, Vec<PricePoint>> {
        let mut out = HashMap::new();

        // Single-symbol shape: {"meta": ..., "values": [...]}
        if body.get("values").is_some() {
            if let (Some(symbol), Ok(payload)) = (
                batch.first(),
                serde_json::from_value::<SeriesPayload>(body.clone()),
            ) {
                let points = parse_series(symbol, &payload);
                if !points.is_empty() {
                    out.insert(symbol.clone(), points);
                }
            }
            return out;
        }

        let Some(object) = body.as_object() else {
            return out;
        };

        for (key, payload) in object {
            // Keys look like "RELIANCE:XNSE"; anything unparseable or
            // carrying a per-symbol error envelope is skipped.
            let Some(symbol) = Symbol::normalize(key.split(':').next().unwrap_or(key)) else {
                continue;
            };
            let Ok(series) = serde_json::from_value::<SeriesPayload>(payload.clone()) else {
                debug!(symbol = %symbol, "Symbol payload had no values array, skipping");
                continue;
            };
            let points = parse_series(&symbol, &series);
            if !points.is_empty() {
                out.insert(symbol, points);
            }
        }
        out
    }
}

/// Coerce candle rows into date-ascending price points, dropping rows
/// whose date or close fails to parse.
fn parse_series(symbol: &Symbol, payload: &SeriesPayload) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = payload
        .values
        .iter()
        .filter_map(|row| {
            // Vendor datetimes are "YYYY-MM-DD" or "YYYY-MM-DD HH:MM:SS".
            let date_part = row.datetime.get(..10)?;
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
            let close: f64 = row.close.parse().ok()?;
            Some(PricePoint {
                symbol: symbol.clone(),
                date,
                close,
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    points
}

#[async_trait]
impl CloseSource for QuoteApiSource {
    #[instrument(skip(self, symbols), fields(universe = symbols.len(), ?window))]
    async fn fetch_closes(
        &self,
        symbols: &[Symbol],
        _as_of: NaiveDate,
        window: FetchWindow,
    ) -> Result<FetchOutcome, SourceError> {
        let output_size = match window {
            FetchWindow::Seed => self.config.seed_output_size,
            FetchWindow::Incremental => self.config.incremental_output_size,
        };

        let mut outcome = FetchOutcome::default();
        let mut calls: u32 = 0;

        for batch in symbols.chunks(self.config.batch_size) {
            if calls > 0 && calls % self.config.pace_every == 0 {
                debug!(
                    calls,
                    delay_ms = self.config.pace_delay_ms,
                    "Pacing delay before next batch"
                );
                tokio::time::sleep(Duration::from_millis(self.config.pace_delay_ms)).await;
            }
            calls += 1;

            let result = self
                .retry
                .run("quote_batch", || self.fetch_batch(batch, output_size))
                .await;

            match result {
                Ok(mut fetched) => {
                    for symbol in batch {
                        match fetched.remove(symbol) {
                            Some(points) => {
                                outcome.closes.insert(symbol.clone(), points);
                            }
                            None => outcome.failed.push(symbol.clone()),
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %err,
                        "Batch failed after retries, skipping its symbols"
                    );
                    outcome.failed.extend(batch.iter().cloned());
                }
            }
        }

        if outcome.closes.is_empty() {
            return Err(SourceError::AllSymbolsFailed(format!(
                "{} symbols requested, none returned data",
                symbols.len()
            )));
        }

        debug!(
            fetched = outcome.closes.len(),
            failed = outcome.failed.len(),
            points = outcome.point_count(),
            "Quote-API fetch complete"
        );
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "quote_api"
    }
}
