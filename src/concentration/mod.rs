//! Market concentration module
//!
//! This module provides:
//! - Aggregation of raw pool block counts into daily market shares
//! - The Herfindahl-Hirschman Index over those shares

pub mod aggregator;

pub use aggregator::{herfindahl, Aggregator, ConcentrationError, PoolShareTable, OTHERS};
