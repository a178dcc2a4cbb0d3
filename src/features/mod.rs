//! Feature engineering module
//!
//! This module provides:
//! - Lag features (1, 7 and 30 days) for any daily series
//! - Calendar features (month, day of year, day of week)

pub mod lags;

pub use lags::{
    calendar_features, feature_vector, LagFeatureBuilder, LaggedFeatureRow, FEATURE_NAMES, LAGS,
    MAX_LAG, NUM_FEATURES,
};
