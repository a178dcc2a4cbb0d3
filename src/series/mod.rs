//! Daily time series module
//!
//! This module provides:
//! - A gap-free daily series type
//! - Resampling of sparse series onto a daily calendar

pub mod daily;
pub mod resample;

pub use daily::DailySeries;
pub use resample::{daily_mean, forward_fill, interpolate, interpolate_daily};
