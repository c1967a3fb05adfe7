//! Closes Ledger Codec - Gzip-Compressed CSV Round-Trip
//!
//! The rolling close store's durable form: gzip-compressed CSV rows of
//! `date,symbol,close`, date-ascending within each symbol. A 1400-point
//! ledger over 500 symbols compresses to a few hundred kilobytes, small
//! enough to ship alongside the dashboard artifacts.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::domain::prices::{PricePoint, RollingStore};
use crate::domain::symbol::Symbol;

/// One serialized ledger row.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    date: NaiveDate,
    symbol: String,
    close: f64,
}

/// Serialize the store to gzip-compressed CSV bytes.
pub fn encode(store: &RollingStore) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut writer = csv::Writer::from_writer(encoder);

    for (symbol, ledger) in store.iter() {
        for point in ledger {
            writer
                .serialize(LedgerRow {
                    date: point.date,
                    symbol: symbol.to_string(),
                    close: point.close,
                })
                .context("Failed to serialize ledger row")?;
        }
    }

    let encoder = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush ledger CSV: {e}"))?;
    encoder.finish().context("Failed to finish gzip stream")
}

/// Deserialize gzip-compressed CSV bytes back into a store.
///
/// Rows with unknown/blank symbols are dropped; ordering and dedup are
/// re-established by the store's own upsert invariants, so a ledger
/// written by an older run always loads cleanly.
pub fn decode(bytes: &[u8], retention: usize) -> Result<RollingStore> {
    let decoder = GzDecoder::new(bytes);
    let mut reader = csv::Reader::from_reader(decoder);

    let mut store = RollingStore::new(retention);
    let mut points = Vec::new();
    for row in reader.deserialize::<LedgerRow>() {
        let row = row.context("Failed to parse ledger row")?;
        let Some(symbol) = Symbol::normalize(&row.symbol) else {
            continue;
        };
        points.push(PricePoint {
            symbol,
            date: row.date,
            close: row.close,
        });
    }
    store.upsert(points);
    Ok(store)
}
