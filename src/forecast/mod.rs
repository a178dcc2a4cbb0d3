//! Forecasting module
//!
//! This module provides:
//! - Recursive day-by-day forecasting with a trained model
//! - Output series that mark where history ends

pub mod recursive;

pub use recursive::{
    step_features, ForecastError, ForecastPoint, ForecastSeries, Predictor, RecursiveForecaster,
};
