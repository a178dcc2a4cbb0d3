//! Recursive multi-step forecasting
//!
//! Each step predicts the day after the current pseudo-history and appends
//! the prediction, so later steps read earlier predictions as their lags.
//!
//! When the pseudo-history is shorter than a lag, that lag falls back to the
//! lag-1 value. Forecasts started from fewer than 30 days of history are
//! biased by this fallback during their first steps.

use crate::features::{feature_vector, LAGS, NUM_FEATURES};
use crate::models::{GbmRegressor, ModelError};
use crate::series::DailySeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while forecasting
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Cannot forecast from an empty history")]
    EmptyHistory,

    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),
}

/// A model that maps one feature vector to one prediction
pub trait Predictor {
    fn predict_features(&self, features: &[f64]) -> Result<f64, ModelError>;
}

impl Predictor for GbmRegressor {
    fn predict_features(&self, features: &[f64]) -> Result<f64, ModelError> {
        self.predict_one(features)
    }
}

/// Value `lag` positions from the end, or `fallback` if the history is too short
fn lag_or(history: &[f64], lag: usize, fallback: f64) -> f64 {
    history
        .len()
        .checked_sub(lag)
        .map_or(fallback, |idx| history[idx])
}

/// Model inputs for the day following `history`.
///
/// Returns `None` for an empty history.
pub fn step_features(history: &[f64], next_date: NaiveDate) -> Option<[f64; NUM_FEATURES]> {
    let lag1 = *history.last()?;
    let lag7 = lag_or(history, LAGS[1], lag1);
    let lag30 = lag_or(history, LAGS[2], lag1);
    Some(feature_vector(lag1, lag7, lag30, next_date))
}

/// One output point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub is_forecast: bool,
}

/// History followed by predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    series: DailySeries,
    history_end: NaiveDate,
}

impl ForecastSeries {
    pub fn new(series: DailySeries, history_end: NaiveDate) -> Self {
        Self {
            series,
            history_end,
        }
    }

    /// The full series: history, then predictions
    pub fn series(&self) -> &DailySeries {
        &self.series
    }

    /// Last historical date; every later date is predicted
    pub fn history_end(&self) -> NaiveDate {
        self.history_end
    }

    /// First predicted date, if any prediction was made
    pub fn first_forecast_date(&self) -> Option<NaiveDate> {
        self.forecast().first_date()
    }

    pub fn history(&self) -> DailySeries {
        self.series.until(self.history_end)
    }

    pub fn forecast(&self) -> DailySeries {
        self.series.after(self.history_end)
    }

    /// Number of predicted days
    pub fn horizon_len(&self) -> usize {
        self.forecast().len()
    }

    pub fn points(&self) -> Vec<ForecastPoint> {
        self.series
            .iter()
            .map(|(date, value)| ForecastPoint {
                date,
                value,
                is_forecast: date > self.history_end,
            })
            .collect()
    }
}

/// Extends a history day by day with a trained model
#[derive(Debug)]
pub struct RecursiveForecaster<'a, M: Predictor> {
    model: &'a M,
}

impl<'a, M: Predictor> RecursiveForecaster<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    /// Forecast every day after the last historical date through `horizon_end`.
    ///
    /// A horizon on or before the last historical date returns the history unchanged.
    pub fn forecast(
        &self,
        history: &DailySeries,
        horizon_end: NaiveDate,
    ) -> Result<ForecastSeries, ForecastError> {
        let last_date = history.last_date().ok_or(ForecastError::EmptyHistory)?;
        let steps = (horizon_end - last_date).num_days();

        if steps <= 0 {
            info!(
                "Horizon {} is not after last historical date {}, nothing to forecast",
                horizon_end, last_date
            );
            return Ok(ForecastSeries::new(history.clone(), last_date));
        }

        info!("Forecasting {} days from {} to {}", steps, last_date, horizon_end);

        // Owned copy; the caller's history is never touched
        let mut pseudo_history = history.clone();

        for _ in 0..steps {
            let next_date = pseudo_history.date_at(pseudo_history.len());
            let features = step_features(pseudo_history.values(), next_date)
                .ok_or(ForecastError::EmptyHistory)?;
            let prediction = self.model.predict_features(&features)?;

            debug!("{} -> {:.6}", next_date, prediction);
            pseudo_history.push(prediction);
        }

        Ok(ForecastSeries::new(pseudo_history, last_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts one of its input features unchanged
    struct Echo(usize);

    impl Predictor for Echo {
        fn predict_features(&self, features: &[f64]) -> Result<f64, ModelError> {
            Ok(features[self.0])
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ramp(n: usize) -> DailySeries {
        DailySeries::new(date(2024, 1, 1), (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn test_step_features_lags() {
        let history: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let x = step_features(&history, date(2024, 2, 10)).unwrap();

        assert_eq!(x[0], 39.0);
        assert_eq!(x[1], 33.0);
        assert_eq!(x[2], 10.0);
        assert_eq!(x[3], 2.0);
        assert_eq!(x[4], 41.0);
    }

    #[test]
    fn test_short_history_falls_back_to_lag1() {
        let history = [1.0, 2.0, 3.0, 4.0, 5.0];
        let x = step_features(&history, date(2024, 1, 6)).unwrap();

        assert_eq!(x[..3], [5.0, 5.0, 5.0]);
        assert!(step_features(&[], date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_horizon_length_and_contiguity() {
        let history = ramp(45);
        let last = history.last_date().unwrap();
        let horizon_end = date(2024, 3, 1);

        let result = RecursiveForecaster::new(&Echo(0))
            .forecast(&history, horizon_end)
            .unwrap();

        let expected_steps = (horizon_end - last).num_days() as usize;
        assert_eq!(result.horizon_len(), expected_steps);
        assert_eq!(result.first_forecast_date(), Some(last + chrono::Duration::days(1)));
        assert_eq!(result.series().last_date(), Some(horizon_end));
        assert_eq!(result.history(), history);
    }

    #[test]
    fn test_predictions_feed_back() {
        let history = ramp(40);

        // Echoing lag7 repeats the last week once history runs out
        let result = RecursiveForecaster::new(&Echo(1))
            .forecast(&history, date(2024, 2, 23))
            .unwrap();

        let forecast = result.forecast();
        assert_eq!(forecast.len(), 14);
        assert_eq!(&forecast.values()[..7], &[33.0, 34.0, 35.0, 36.0, 37.0, 38.0, 39.0]);
        assert_eq!(&forecast.values()[7..], &[33.0, 34.0, 35.0, 36.0, 37.0, 38.0, 39.0]);
    }

    #[test]
    fn test_horizon_not_after_history_is_noop() {
        let history = ramp(35);
        let last = history.last_date().unwrap();
        let forecaster = RecursiveForecaster::new(&Echo(0));

        for horizon in [last, date(2024, 1, 10), date(2023, 1, 1)] {
            let result = forecaster.forecast(&history, horizon).unwrap();
            assert_eq!(result.series(), &history);
            assert_eq!(result.horizon_len(), 0);
        }
    }

    #[test]
    fn test_empty_history_fails() {
        let empty = DailySeries::empty(date(2024, 1, 1));
        let result = RecursiveForecaster::new(&Echo(0)).forecast(&empty, date(2024, 2, 1));
        assert!(matches!(result, Err(ForecastError::EmptyHistory)));
    }

    #[test]
    fn test_points_mark_forecast() {
        let history = ramp(31);
        let result = RecursiveForecaster::new(&Echo(0))
            .forecast(&history, date(2024, 2, 3))
            .unwrap();

        let points = result.points();
        assert_eq!(points.len(), 34);
        assert!(points[..31].iter().all(|p| !p.is_forecast));
        assert!(points[31..].iter().all(|p| p.is_forecast && p.value == 30.0));
    }
}
