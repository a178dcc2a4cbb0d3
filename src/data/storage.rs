//! File storage for inputs and forecast output
//!
//! Inputs are read as JSON. Forecasts are written as JSON reports and as
//! flat CSV files with one row per day.

use super::ingest::{parse_market_payload, parse_pool_counts, parse_price_payload, DataError};
use super::types::{DailyPoolRecord, PricePoint};
use crate::forecast::{ForecastPoint, ForecastSeries};
use chrono::NaiveDate;
use csv::Writer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::info;

/// Serializable view of one forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub target: String,
    /// Last historical date
    pub history_end: NaiveDate,
    pub points: Vec<ForecastPoint>,
}

impl ForecastReport {
    pub fn new(target: &str, forecast: &ForecastSeries) -> Self {
        Self {
            target: target.to_string(),
            history_end: forecast.history_end(),
            points: forecast.points(),
        }
    }
}

/// Read any JSON document
pub fn load_json(path: &Path) -> Result<Value, DataError> {
    let file = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(value)
}

/// Read a pool payload (date -> pool -> count)
pub fn load_pool_counts(path: &Path) -> Result<Vec<DailyPoolRecord>, DataError> {
    parse_pool_counts(&load_json(path)?)
}

/// Read a price payload (`{"prices": [[ms, value], ...]}`)
pub fn load_price_points(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    parse_price_payload(&load_json(path)?)
}

/// Read a combined payload (`{"pools": ..., "prices": ...}`)
pub fn load_market_payload(
    path: &Path,
) -> Result<(Vec<DailyPoolRecord>, Vec<PricePoint>), DataError> {
    parse_market_payload(&load_json(path)?)
}

/// Write any serializable value as pretty JSON
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DataError> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Write forecast points as CSV: `date,value,is_forecast`
pub fn write_points_csv<W: Write>(writer: W, points: &[ForecastPoint]) -> Result<(), DataError> {
    let mut writer = Writer::from_writer(writer);

    writer.write_record(["date", "value", "is_forecast"])?;

    for point in points {
        writer.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            point.value.to_string(),
            point.is_forecast.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a forecast to a CSV file
pub fn save_forecast_csv(path: &Path, forecast: &ForecastSeries) -> Result<(), DataError> {
    let file = File::create(path)?;
    let points = forecast.points();
    write_points_csv(file, &points)?;

    info!("Saved {} rows to {}", points.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::DailySeries;
    use tempfile::tempdir;

    fn sample_forecast() -> ForecastSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = DailySeries::new(start, vec![1.0, 2.0, 3.5, 4.25]);
        ForecastSeries::new(series, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    #[test]
    fn test_points_csv_layout() {
        let mut buffer = Vec::new();
        write_points_csv(&mut buffer, &sample_forecast().points()).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,value,is_forecast");
        assert_eq!(lines[1], "2024-01-01,1,false");
        assert_eq!(lines[2], "2024-01-02,2,false");
        assert_eq!(lines[3], "2024-01-03,3.5,true");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_report_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hhi.json");
        let report = ForecastReport::new("hhi", &sample_forecast());

        save_json(&path, &report).unwrap();
        let loaded: ForecastReport = serde_json::from_value(load_json(&path).unwrap()).unwrap();

        assert_eq!(loaded, report);
        assert_eq!(loaded.points.iter().filter(|p| p.is_forecast).count(), 2);
    }

    #[test]
    fn test_load_payload_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("market.json");
        fs::write(
            &path,
            r#"{"pools": {"2024-01-01": {"A": 3, "B": "2"}}, "prices": [[1704067200000, 42000.5]]}"#,
        )
        .unwrap();

        let (pools, prices) = load_market_payload(&path).unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(prices, vec![PricePoint::new(1704067200000, 42000.5)]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_json(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(DataError::Io(_))));
    }
}
