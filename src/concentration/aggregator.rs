//! Pool share aggregation and the Herfindahl-Hirschman Index
//!
//! Raw per-pool block counts are pivoted per day and collapsed into a fixed
//! bucket set: the configured major pools, in order, followed by a synthetic
//! [`OTHERS`] bucket holding every other label.

use crate::data::DailyPoolRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Label of the aggregate bucket for non-major pools
pub const OTHERS: &str = "Others";

/// Errors raised while configuring the aggregation
#[derive(Error, Debug, PartialEq)]
pub enum ConcentrationError {
    #[error("Major pool label '{0}' is reserved for the aggregate bucket")]
    ReservedLabel(String),
}

/// Sum of squared shares.
pub fn herfindahl(shares: &[f64]) -> f64 {
    shares.iter().map(|s| s * s).sum()
}

/// Daily market shares over a fixed bucket set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolShareTable {
    buckets: Vec<String>,
    shares: BTreeMap<NaiveDate, Vec<f64>>,
}

impl PoolShareTable {
    /// Bucket labels; every row of shares is aligned with them
    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    /// Number of dates with defined shares
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.shares.keys().copied()
    }

    /// Shares on `date`, aligned with [`buckets`](Self::buckets)
    pub fn shares_on(&self, date: NaiveDate) -> Option<&[f64]> {
        self.shares.get(&date).map(|s| s.as_slice())
    }

    /// Share of a single bucket on `date`
    pub fn share(&self, date: NaiveDate, bucket: &str) -> Option<f64> {
        let idx = self.buckets.iter().position(|b| b == bucket)?;
        self.shares_on(date).map(|s| s[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> + '_ {
        self.shares.iter().map(|(&d, s)| (d, s.as_slice()))
    }

    /// Concentration index for every date in the table
    pub fn hhi(&self) -> BTreeMap<NaiveDate, f64> {
        self.shares
            .iter()
            .map(|(&date, shares)| (date, herfindahl(shares)))
            .collect()
    }
}

/// Turns raw block counts into daily pool shares
#[derive(Debug, Clone)]
pub struct Aggregator {
    start_date: NaiveDate,
    major_pools: Vec<String>,
}

impl Aggregator {
    /// Create an aggregator for records dated on or after `start_date`.
    ///
    /// Duplicate major labels are collapsed, keeping the first occurrence.
    pub fn new(start_date: NaiveDate, major_pools: &[String]) -> Result<Self, ConcentrationError> {
        let mut seen = HashSet::new();
        let mut majors = Vec::with_capacity(major_pools.len());

        for pool in major_pools {
            if pool == OTHERS {
                return Err(ConcentrationError::ReservedLabel(pool.clone()));
            }
            if seen.insert(pool.as_str()) {
                majors.push(pool.clone());
            }
        }

        Ok(Self {
            start_date,
            major_pools: majors,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn major_pools(&self) -> &[String] {
        &self.major_pools
    }

    /// Major pools followed by the aggregate bucket
    pub fn bucket_labels(&self) -> Vec<String> {
        let mut labels = self.major_pools.clone();
        labels.push(OTHERS.to_string());
        labels
    }

    /// Per-date block counts keyed by raw pool label.
    ///
    /// Repeated `(date, pool)` records are summed.
    pub fn pivot(&self, records: &[DailyPoolRecord]) -> BTreeMap<NaiveDate, BTreeMap<String, f64>> {
        let mut table: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();

        for record in records.iter().filter(|r| r.date >= self.start_date) {
            *table
                .entry(record.date)
                .or_default()
                .entry(record.pool.clone())
                .or_insert(0.0) += record.blocks;
        }

        table
    }

    /// Block counts per bucket, aligned with [`bucket_labels`](Self::bucket_labels)
    fn bucket_counts(&self, counts: &BTreeMap<String, f64>) -> Vec<f64> {
        let mut buckets: Vec<f64> = self
            .major_pools
            .iter()
            .map(|pool| counts.get(pool).copied().unwrap_or(0.0))
            .collect();

        let others: f64 = counts
            .iter()
            .filter(|(pool, _)| !self.major_pools.contains(*pool))
            .map(|(_, blocks)| blocks)
            .sum();
        buckets.push(others);

        buckets
    }

    /// Daily shares over the bucket set; days without blocks are excluded
    pub fn share_table(&self, records: &[DailyPoolRecord]) -> PoolShareTable {
        let mut shares = BTreeMap::new();
        let mut skipped = 0usize;

        for (date, counts) in self.pivot(records) {
            let buckets = self.bucket_counts(&counts);
            let total: f64 = buckets.iter().sum();

            if !(total > 0.0) {
                debug!("No blocks recorded on {}, shares undefined", date);
                skipped += 1;
                continue;
            }

            shares.insert(date, buckets.iter().map(|c| c / total).collect());
        }

        info!(
            "Built share table: {} days over {} buckets ({} days without blocks)",
            shares.len(),
            self.major_pools.len() + 1,
            skipped
        );

        PoolShareTable {
            buckets: self.bucket_labels(),
            shares,
        }
    }

    /// Daily concentration index from raw records
    pub fn hhi_series(&self, records: &[DailyPoolRecord]) -> BTreeMap<NaiveDate, f64> {
        self.share_table(records).hhi()
    }
}
