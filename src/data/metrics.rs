//! Network metrics loading (CoinMetrics-style CSV)
//!
//! Column names differ between exports, so each metric is resolved from an
//! ordered list of candidate headers. The first candidate present wins.

use super::ingest::{parse_date, DataError};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Candidate headers for each metric, highest priority first
pub mod columns {
    pub const TIME: &[&str] = &["time", "Date", "date"];
    pub const DIFFICULTY: &[&str] = &["DiffMean", "DiffLast", "Difficulty"];
    pub const HASHRATE: &[&str] = &["HashRate", "HashRateMean", "HashRate7d", "HashRate30d"];
    pub const PRICE_USD: &[&str] = &["PriceUSD", "Price(USD)", "price_usd", "PriceUsd"];
    pub const FEES_USD: &[&str] = &["FeeTotUSD", "FeesUSD", "FeeUSD"];
    pub const FEES_BTC: &[&str] = &["FeeTotNtv", "FeesNtv", "FeeTotBTC", "FeesBTC"];
}

/// Find the first candidate present among `headers` (case-insensitive).
///
/// Returns the header index.
pub fn pick_column<S: AsRef<str>>(headers: &[S], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .position(|h| h.as_ref().eq_ignore_ascii_case(candidate))
    })
}

/// Like [`pick_column`], but a missing column is an error.
pub fn require_column<S: AsRef<str>>(headers: &[S], candidates: &[&str]) -> Result<usize, DataError> {
    pick_column(headers, candidates).ok_or_else(|| DataError::ColumnNotFound {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}

/// One day of network metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetricsRow {
    /// Row number in the source file, counted from 0 after the header
    pub position: usize,
    /// `None` when the source has no time column
    pub date: Option<NaiveDate>,
    /// Network hashrate in H/s
    pub hashrate: Option<f64>,
    pub price_usd: Option<f64>,
    /// Total fees paid that day, in USD
    pub fees_usd: Option<f64>,
    /// Total fees paid that day, in BTC
    pub fees_btc: Option<f64>,
    pub difficulty: Option<f64>,
}

/// Which optional metrics the source provided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsAvailability {
    pub hashrate: bool,
    pub price_usd: bool,
    pub fees_usd: bool,
    pub fees_btc: bool,
    pub difficulty: bool,
}

impl MetricsAvailability {
    /// Inputs missing for a revenue estimate
    pub fn missing_for_revenue(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.hashrate {
            missing.push("HashRate".to_string());
        }
        if !self.price_usd {
            missing.push("PriceUSD".to_string());
        }
        if !self.fees_usd && !self.fees_btc {
            missing.push("Fees (FeeTotUSD or FeeTotNtv)".to_string());
        }
        missing
    }
}

/// Network metrics table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub rows: Vec<NetworkMetricsRow>,
    pub available: MetricsAvailability,
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    let raw = record.get(idx?)?.trim();
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Load network metrics from any CSV reader.
///
/// Without a time column, rows keep their file order and carry no date.
/// With one, rows whose time cannot be parsed are skipped and the rest are
/// sorted by date.
pub fn read_network_metrics<R: Read>(reader: R) -> Result<NetworkMetrics, DataError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let time_idx = pick_column(&headers, columns::TIME);
    if time_idx.is_none() {
        warn!("No time column found; continuing with rows in file order");
    }
    let hashrate_idx = pick_column(&headers, columns::HASHRATE);
    let price_idx = pick_column(&headers, columns::PRICE_USD);
    let fees_usd_idx = pick_column(&headers, columns::FEES_USD);
    let fees_btc_idx = pick_column(&headers, columns::FEES_BTC);
    let difficulty_idx = pick_column(&headers, columns::DIFFICULTY);

    let available = MetricsAvailability {
        hashrate: hashrate_idx.is_some(),
        price_usd: price_idx.is_some(),
        fees_usd: fees_usd_idx.is_some(),
        fees_btc: fees_btc_idx.is_some(),
        difficulty: difficulty_idx.is_some(),
    };

    let mut rows = Vec::new();
    for (position, result) in reader.records().enumerate() {
        let record = result?;

        let date = match time_idx {
            Some(idx) => {
                let Some(date) = record.get(idx).and_then(parse_date) else {
                    warn!("Skipping metrics row with unparseable time: {:?}", record.get(idx));
                    continue;
                };
                Some(date)
            }
            None => None,
        };

        rows.push(NetworkMetricsRow {
            position,
            date,
            hashrate: cell(&record, hashrate_idx),
            price_usd: cell(&record, price_idx),
            fees_usd: cell(&record, fees_usd_idx),
            fees_btc: cell(&record, fees_btc_idx),
            difficulty: cell(&record, difficulty_idx),
        });
    }

    if time_idx.is_some() {
        rows.sort_by_key(|r| r.date);
    }

    info!("Loaded {} network metrics rows ({:?})", rows.len(), available);

    Ok(NetworkMetrics { rows, available })
}

/// Load network metrics from a CSV file.
pub fn load_network_metrics(path: &Path) -> Result<NetworkMetrics, DataError> {
    let file = std::fs::File::open(path)?;
    read_network_metrics(file)
}
