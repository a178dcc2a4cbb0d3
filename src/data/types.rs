//! Data types for pool production and price data
//!
//! This module defines the core data structures used throughout the project.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Blocks produced by one mining pool on one day, as reported by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoolRecord {
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Pool label (e.g., "Foundry USA")
    pub pool: String,
    /// Number of blocks found by the pool on that day
    pub blocks: f64,
}

impl DailyPoolRecord {
    pub fn new(date: NaiveDate, pool: impl Into<String>, blocks: f64) -> Self {
        Self {
            date,
            pool: pool.into(),
            blocks,
        }
    }
}

/// A single price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Observation time in epoch milliseconds
    pub timestamp_ms: i64,
    /// Price value
    pub value: f64,
}

impl PricePoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// Observation time as a UTC timestamp
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    /// Calendar day (UTC) of the observation
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp().map(|ts| ts.date_naive())
    }
}

/// Dataset for machine learning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Feature names
    pub feature_names: Vec<String>,
    /// Feature matrix (rows = samples, cols = features)
    pub features: Vec<Vec<f64>>,
    /// Target values
    pub targets: Vec<f64>,
    /// Date of each sample
    pub dates: Vec<NaiveDate>,
    /// Name of the series the samples were built from
    pub series: String,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(series: String, feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            features: Vec::new(),
            targets: Vec::new(),
            dates: Vec::new(),
            series,
        }
    }

    /// Add a sample to the dataset
    pub fn add_sample(&mut self, features: Vec<f64>, target: f64, date: NaiveDate) {
        self.features.push(features);
        self.targets.push(target);
        self.dates.push(date);
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Get the number of features
    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }
}
