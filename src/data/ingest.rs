//! Parsing of raw pool and price payloads
//!
//! Payloads arrive as loosely typed JSON. Numbers may be encoded as strings;
//! values that cannot be read as a finite number are dropped rather than
//! replaced with zero. A missing top-level structure is an error naming the
//! absent field.

use super::types::{DailyPoolRecord, PricePoint};
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while reading input data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid structure for '{field}': expected {expected}")]
    InvalidShape {
        field: String,
        expected: &'static str,
    },

    #[error("No column found among candidates: {}", .candidates.join(", "))]
    ColumnNotFound { candidates: Vec<String> },

    #[error("Missing required inputs: {}", .0.join(", "))]
    MissingRequirements(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a JSON value as a finite number.
///
/// Accepts JSON numbers and numeric strings; everything else yields `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Parse a calendar date, ignoring any time-of-day suffix.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Look up a required field of a JSON object.
pub fn required_field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, DataError> {
    match value.get(name) {
        Some(Value::Null) | None => Err(DataError::MissingField(name.to_string())),
        Some(field) => Ok(field),
    }
}

/// Parse a `date → pool → block count` mapping into flat records.
///
/// Records are returned sorted by date, then by pool label.
pub fn parse_pool_counts(value: &Value) -> Result<Vec<DailyPoolRecord>, DataError> {
    let days = value.as_object().ok_or_else(|| DataError::InvalidShape {
        field: "pools".to_string(),
        expected: "object of date -> {pool: count}",
    })?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (raw_date, pools) in days {
        let Some(date) = parse_date(raw_date) else {
            warn!("Skipping pool entry with unparseable date: {:?}", raw_date);
            continue;
        };

        let Some(pools) = pools.as_object() else {
            warn!("Skipping pool entry for {}: not an object", date);
            continue;
        };

        for (pool, count) in pools {
            match coerce_number(count) {
                Some(blocks) if blocks >= 0.0 => {
                    records.push(DailyPoolRecord::new(date, pool.clone(), blocks));
                }
                _ => {
                    debug!("Dropping non-numeric block count for {} on {}: {}", pool, date, count);
                    dropped += 1;
                }
            }
        }
    }

    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.pool.cmp(&b.pool)));

    info!(
        "Parsed {} pool records ({} dropped as non-numeric)",
        records.len(),
        dropped
    );

    Ok(records)
}

/// Parse an array of `[timestamp_ms, value]` pairs.
///
/// Points are returned in chronological order.
pub fn parse_price_series(value: &Value) -> Result<Vec<PricePoint>, DataError> {
    let entries = value.as_array().ok_or_else(|| DataError::InvalidShape {
        field: "prices".to_string(),
        expected: "array of [timestamp_ms, value] pairs",
    })?;

    let mut points: Vec<PricePoint> = entries
        .iter()
        .filter_map(|entry| {
            let pair = entry.as_array().filter(|p| p.len() >= 2);
            let point = pair.and_then(|p| {
                let timestamp = coerce_number(&p[0])?;
                let price = coerce_number(&p[1])?;
                Some(PricePoint::new(timestamp as i64, price))
            });

            if point.is_none() {
                debug!("Dropping malformed price entry: {}", entry);
            }
            point
        })
        .collect();

    points.sort_by_key(|p| p.timestamp_ms);

    info!("Parsed {} price points", points.len());

    Ok(points)
}

/// Parse a payload carrying a `prices` field (CoinGecko `market_chart` shape).
pub fn parse_price_payload(value: &Value) -> Result<Vec<PricePoint>, DataError> {
    parse_price_series(required_field(value, "prices")?)
}

/// Parse a combined `{ "pools": {...}, "prices": [...] }` payload.
pub fn parse_market_payload(
    value: &Value,
) -> Result<(Vec<DailyPoolRecord>, Vec<PricePoint>), DataError> {
    let pools = parse_pool_counts(required_field(value, "pools")?)?;
    let prices = parse_price_series(required_field(value, "prices")?)?;
    Ok((pools, prices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(12)), Some(12.0));
        assert_eq!(coerce_number(&json!("3.5")), Some(3.5));
        assert_eq!(coerce_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(coerce_number(&json!("n/a")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_parse_date_with_time_suffix() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(parse_date("2024-05-01"), expected);
        assert_eq!(parse_date("2024-05-01T00:00:00Z"), expected);
        assert_eq!(parse_date("May 1st"), None);
    }

    #[test]
    fn test_parse_pool_counts_drops_uncoercible() {
        let payload = json!({
            "2024-01-02": {"Foundry USA": 30, "AntPool": "25", "Unknown": "lots"},
            "2024-01-01": {"Foundry USA": 28, "ViaBTC": -1},
            "garbage": {"AntPool": 3}
        });

        let records = parse_pool_counts(&payload).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(records[0].pool, "Foundry USA");
        assert!(records.iter().all(|r| r.pool != "Unknown" && r.pool != "ViaBTC"));
        assert!(records.iter().any(|r| r.pool == "AntPool" && r.blocks == 25.0));
    }

    #[test]
    fn test_parse_pool_counts_rejects_non_object() {
        let err = parse_pool_counts(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, DataError::InvalidShape { .. }));
    }

    #[test]
    fn test_parse_price_payload() {
        let payload = json!({
            "prices": [[1704153600000i64, 44000.5], [1704067200000i64, "42000"], [1704240000000i64, null], "bad"]
        });

        let points = parse_price_payload(&payload).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp_ms, 1_704_067_200_000);
        assert_eq!(points[0].value, 42000.0);
        assert_eq!(points[1].value, 44000.5);
    }

    #[test]
    fn test_missing_field_names_field() {
        let err = parse_price_payload(&json!({"market_caps": []})).unwrap_err();
        match err {
            DataError::MissingField(name) => assert_eq!(name, "prices"),
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_market_payload(&json!({"prices": []})).unwrap_err();
        assert!(matches!(err, DataError::MissingField(ref name) if name == "pools"));
    }
}
