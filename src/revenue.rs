//! Expected mining revenue for a single miner
//!
//! expected BTC/day = (miner H/s / network H/s) * blocks/day * (subsidy + fees/block)
//!
//! Fees per block come from the BTC fee column when the source has one,
//! otherwise from USD fees converted at the day's price.

use crate::data::{DataError, NetworkMetrics, NetworkMetricsRow};
use chrono::NaiveDate;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// H/s per TH/s
const HASHES_PER_TERAHASH: f64 = 1e12;

/// Miner and protocol constants for the estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueParams {
    /// Miner hashrate in TH/s
    pub miner_hashrate_th: f64,
    pub blocks_per_day: f64,
    /// Block subsidy in BTC
    pub block_subsidy_btc: f64,
}

impl Default for RevenueParams {
    fn default() -> Self {
        Self {
            miner_hashrate_th: 100.0,
            blocks_per_day: 144.0,
            block_subsidy_btc: 3.125,
        }
    }
}

impl RevenueParams {
    pub fn miner_hashrate_hs(&self) -> f64 {
        self.miner_hashrate_th * HASHES_PER_TERAHASH
    }
}

/// Estimated revenue for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEstimate {
    /// Source row number, the only key when the source has no dates
    pub position: usize,
    pub date: Option<NaiveDate>,
    pub price_usd: f64,
    pub net_hashrate_hs: f64,
    pub fees_per_block_btc: f64,
    pub expected_btc_per_day: f64,
    pub expected_usd_per_day: f64,
}

/// Fee source chosen once for the whole table
#[derive(Debug, Clone, Copy)]
enum FeeSource {
    Btc,
    UsdAtPrice,
}

fn fees_per_block(row: &NetworkMetricsRow, source: FeeSource, blocks_per_day: f64) -> Option<f64> {
    let fees_btc = match source {
        FeeSource::Btc => row.fees_btc?,
        FeeSource::UsdAtPrice => {
            // Undefined at zero price
            let price = row.price_usd.filter(|p| *p != 0.0)?;
            row.fees_usd? / price
        }
    };
    Some(fees_btc / blocks_per_day)
}

fn estimate_row(
    row: &NetworkMetricsRow,
    source: FeeSource,
    params: &RevenueParams,
) -> Option<RevenueEstimate> {
    let price_usd = row.price_usd?;
    let net_hashrate_hs = row.hashrate?;
    let fees_per_block_btc = fees_per_block(row, source, params.blocks_per_day)?;

    let expected_btc_per_day = (params.miner_hashrate_hs() / net_hashrate_hs)
        * params.blocks_per_day
        * (params.block_subsidy_btc + fees_per_block_btc);
    let expected_usd_per_day = expected_btc_per_day * price_usd;

    let estimate = RevenueEstimate {
        position: row.position,
        date: row.date,
        price_usd,
        net_hashrate_hs,
        fees_per_block_btc,
        expected_btc_per_day,
        expected_usd_per_day,
    };

    let finite = [
        estimate.price_usd,
        estimate.net_hashrate_hs,
        estimate.fees_per_block_btc,
        estimate.expected_btc_per_day,
        estimate.expected_usd_per_day,
    ]
    .iter()
    .all(|v| v.is_finite());

    finite.then_some(estimate)
}

/// Estimate daily revenue for every usable metrics row.
///
/// Fails when hashrate, price, or both fee columns are absent. Rows with any
/// missing or non-finite value are dropped.
pub fn estimate_revenue(
    metrics: &NetworkMetrics,
    params: &RevenueParams,
) -> Result<Vec<RevenueEstimate>, DataError> {
    let missing = metrics.available.missing_for_revenue();
    if !missing.is_empty() {
        return Err(DataError::MissingRequirements(missing));
    }

    let source = if metrics.available.fees_btc {
        FeeSource::Btc
    } else {
        FeeSource::UsdAtPrice
    };
    debug!("Fee source: {:?}", source);

    let estimates: Vec<RevenueEstimate> = metrics
        .rows
        .iter()
        .filter_map(|row| estimate_row(row, source, params))
        .collect();

    info!(
        "Estimated revenue for {} of {} days at {} TH/s",
        estimates.len(),
        metrics.rows.len(),
        params.miner_hashrate_th
    );

    Ok(estimates)
}

/// Write estimates as CSV
pub fn write_revenue_csv<W: Write>(writer: W, estimates: &[RevenueEstimate]) -> Result<(), DataError> {
    let mut writer = Writer::from_writer(writer);

    writer.write_record([
        "position",
        "date",
        "price_usd",
        "net_hashrate_hs",
        "fees_per_block_btc",
        "expected_btc_per_day",
        "expected_usd_per_day",
    ])?;

    for e in estimates {
        writer.write_record([
            e.position.to_string(),
            e.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            e.price_usd.to_string(),
            e.net_hashrate_hs.to_string(),
            e.fees_per_block_btc.to_string(),
            e.expected_btc_per_day.to_string(),
            e.expected_usd_per_day.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write estimates to a CSV file
pub fn save_revenue_csv(path: &Path, estimates: &[RevenueEstimate]) -> Result<(), DataError> {
    let file = std::fs::File::create(path)?;
    write_revenue_csv(file, estimates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{read_network_metrics, MetricsAvailability};
    use approx::assert_relative_eq;

    fn row(day: u32, hashrate: f64, price: f64, fees_usd: Option<f64>, fees_btc: Option<f64>) -> NetworkMetricsRow {
        NetworkMetricsRow {
            position: day as usize - 1,
            date: NaiveDate::from_ymd_opt(2024, 5, day),
            hashrate: Some(hashrate),
            price_usd: Some(price),
            fees_usd,
            fees_btc,
            difficulty: None,
        }
    }

    #[test]
    fn test_formula_with_btc_fees() {
        let metrics = NetworkMetrics {
            rows: vec![row(1, 6e20, 60_000.0, None, Some(14.4))],
            available: MetricsAvailability {
                hashrate: true,
                price_usd: true,
                fees_btc: true,
                ..Default::default()
            },
        };

        let estimates = estimate_revenue(&metrics, &RevenueParams::default()).unwrap();
        let e = &estimates[0];

        // 1e14 / 6e20 * 144 * (3.125 + 0.1)
        assert_relative_eq!(e.fees_per_block_btc, 0.1, epsilon = 1e-12);
        assert_relative_eq!(e.expected_btc_per_day, 1e14 / 6e20 * 144.0 * 3.225, max_relative = 1e-12);
        assert_relative_eq!(e.expected_usd_per_day, e.expected_btc_per_day * 60_000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_usd_fees_converted_at_price() {
        let metrics = NetworkMetrics {
            rows: vec![
                row(1, 5e20, 50_000.0, Some(720_000.0), None),
                // Zero price leaves fees undefined; the row is dropped
                row(2, 5e20, 0.0, Some(720_000.0), None),
            ],
            available: MetricsAvailability {
                hashrate: true,
                price_usd: true,
                fees_usd: true,
                ..Default::default()
            },
        };

        let estimates = estimate_revenue(&metrics, &RevenueParams::default()).unwrap();

        assert_eq!(estimates.len(), 1);
        assert_relative_eq!(estimates[0].fees_per_block_btc, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_requirements_listed() {
        let csv = "time,PriceUSD\n2024-01-01,40000\n";
        let metrics = read_network_metrics(csv.as_bytes()).unwrap();

        match estimate_revenue(&metrics, &RevenueParams::default()) {
            Err(DataError::MissingRequirements(missing)) => {
                assert_eq!(missing.len(), 2);
                assert_eq!(missing[0], "HashRate");
            }
            other => panic!("expected missing requirements, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_with_gaps_dropped_and_csv_written() {
        let csv = "time,HashRate,PriceUSD,FeeTotNtv\n\
                   2024-01-01,5e20,40000,10\n\
                   2024-01-02,,41000,11\n\
                   2024-01-03,0,42000,12\n";
        let metrics = read_network_metrics(csv.as_bytes()).unwrap();
        let estimates = estimate_revenue(&metrics, &RevenueParams::default()).unwrap();

        // Missing hashrate and zero hashrate both drop out
        assert_eq!(estimates.len(), 1);

        let mut buffer = Vec::new();
        write_revenue_csv(&mut buffer, &estimates).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("position,date,price_usd,"));
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("0,2024-01-01,"));
    }

    #[test]
    fn test_estimate_without_time_column() {
        let csv = "HashRate,PriceUSD,FeeTotUSD\n\
                   5e20,50000,720000\n\
                   6e20,60000,864000\n";
        let metrics = read_network_metrics(csv.as_bytes()).unwrap();
        let estimates = estimate_revenue(&metrics, &RevenueParams::default()).unwrap();

        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[1].position, 1);
        assert_eq!(estimates[1].date, None);
        assert_relative_eq!(estimates[1].fees_per_block_btc, 0.1, epsilon = 1e-12);

        let mut buffer = Vec::new();
        write_revenue_csv(&mut buffer, &estimates).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().nth(2).unwrap().starts_with("1,,60000,"));
    }
}
