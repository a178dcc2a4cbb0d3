//! Lag and calendar features for daily series
//!
//! Every row uses only values strictly before its own date, plus calendar
//! attributes of the date itself. Rows without a full 30-day lag history are
//! dropped, never imputed.

use crate::data::Dataset;
use crate::series::DailySeries;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lag offsets in days, in feature order
pub const LAGS: [usize; 3] = [1, 7, 30];

/// Longest lag; rows need this many prior days
pub const MAX_LAG: usize = 30;

/// Number of model features
pub const NUM_FEATURES: usize = 6;

/// Model feature names, in the order of [`LaggedFeatureRow::features`]
pub const FEATURE_NAMES: [&str; NUM_FEATURES] =
    ["lag1", "lag7", "lag30", "month", "day_of_year", "day_of_week"];

/// Calendar features of `date`: month (1-12), day of year (1-366), day of week (Monday = 0)
pub fn calendar_features(date: NaiveDate) -> [f64; 3] {
    [
        date.month() as f64,
        date.ordinal() as f64,
        date.weekday().num_days_from_monday() as f64,
    ]
}

/// Assemble a model input vector from lag values and the target date
pub fn feature_vector(lag1: f64, lag7: f64, lag30: f64, date: NaiveDate) -> [f64; NUM_FEATURES] {
    let [month, day_of_year, day_of_week] = calendar_features(date);
    [lag1, lag7, lag30, month, day_of_year, day_of_week]
}

/// One training sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaggedFeatureRow {
    pub date: NaiveDate,
    pub target: f64,
    pub lag1: f64,
    pub lag7: f64,
    pub lag30: f64,
    pub month: f64,
    pub day_of_year: f64,
    pub day_of_week: f64,
}

impl LaggedFeatureRow {
    /// Model inputs, ordered as [`FEATURE_NAMES`]
    pub fn features(&self) -> [f64; NUM_FEATURES] {
        [
            self.lag1,
            self.lag7,
            self.lag30,
            self.month,
            self.day_of_year,
            self.day_of_week,
        ]
    }
}

/// Builds lagged feature rows from a daily series
#[derive(Debug, Clone, Default)]
pub struct LagFeatureBuilder;

impl LagFeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Feature names in model order
    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
    }

    /// One row per date with at least [`MAX_LAG`] prior days, in date order.
    ///
    /// A series of `n` days yields `max(0, n - 30)` rows.
    pub fn build_rows(&self, series: &DailySeries) -> Vec<LaggedFeatureRow> {
        let values = series.values();

        (MAX_LAG..values.len())
            .map(|i| {
                let date = series.date_at(i);
                let [month, day_of_year, day_of_week] = calendar_features(date);

                LaggedFeatureRow {
                    date,
                    target: values[i],
                    lag1: values[i - LAGS[0]],
                    lag7: values[i - LAGS[1]],
                    lag30: values[i - LAGS[2]],
                    month,
                    day_of_year,
                    day_of_week,
                }
            })
            .collect()
    }

    /// Rows packed into a training dataset named after the series
    pub fn to_dataset(&self, name: &str, rows: &[LaggedFeatureRow]) -> Dataset {
        let mut dataset = Dataset::new(name.to_string(), self.feature_names());

        for row in rows {
            dataset.add_sample(row.features().to_vec(), row.target, row.date);
        }

        dataset
    }

    /// Build rows and pack them into a dataset in one step
    pub fn build_dataset(&self, name: &str, series: &DailySeries) -> Dataset {
        self.to_dataset(name, &self.build_rows(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: NaiveDate, n: usize) -> DailySeries {
        DailySeries::new(start, (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn test_row_count() {
        let builder = LagFeatureBuilder::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        for n in [0, 1, 29, 30, 31, 45, 100] {
            let rows = builder.build_rows(&ramp(start, n));
            assert_eq!(rows.len(), n.saturating_sub(30), "series of length {n}");
        }
    }

    #[test]
    fn test_lag_values_and_calendar() {
        let builder = LagFeatureBuilder::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = builder.build_rows(&ramp(start, 40));

        // 2024-01-31 is the first date with 30 prior days
        let first = rows[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(first.target, 30.0);
        assert_eq!(first.lag1, 29.0);
        assert_eq!(first.lag7, 23.0);
        assert_eq!(first.lag30, 0.0);
        assert_eq!(first.month, 1.0);
        assert_eq!(first.day_of_year, 31.0);
        // Wednesday
        assert_eq!(first.day_of_week, 2.0);

        let last = rows.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());
        assert_eq!(last.month, 2.0);
        assert_eq!(last.day_of_year, 40.0);
    }

    #[test]
    fn test_deterministic() {
        let builder = LagFeatureBuilder::new();
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let series = DailySeries::new(start, (0..90).map(|i| (i as f64 * 0.3).sin()).collect());

        assert_eq!(builder.build_rows(&series), builder.build_rows(&series));
    }

    #[test]
    fn test_dataset_layout() {
        let builder = LagFeatureBuilder::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dataset = builder.build_dataset("price", &ramp(start, 35));

        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.num_features(), NUM_FEATURES);
        assert_eq!(dataset.feature_names[2], "lag30");
        assert_eq!(dataset.features[0][..3], [29.0, 23.0, 0.0]);
        assert_eq!(dataset.targets[0], 30.0);
        assert_eq!(dataset.series, "price");
    }
}
