//! Resampling of sparse series onto a daily calendar
//!
//! Two fill policies are provided:
//! - forward-fill, used for the concentration index
//! - time-weighted linear interpolation, used for prices
//!
//! Neither policy extrapolates: the output spans exactly the first to the
//! last known date. Non-finite inputs count as missing.

use super::daily::DailySeries;
use crate::data::PricePoint;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

fn finite_points(sparse: &BTreeMap<NaiveDate, f64>) -> Vec<(NaiveDate, f64)> {
    sparse
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(&d, &v)| (d, v))
        .collect()
}

/// Fill missing days with the most recent earlier value.
///
/// Returns `None` when the input holds no finite value.
pub fn forward_fill(sparse: &BTreeMap<NaiveDate, f64>) -> Option<DailySeries> {
    let known = finite_points(sparse);
    let (start, first) = *known.first()?;

    let mut series = DailySeries::new(start, vec![first]);
    let mut filled = 0usize;

    for window in known.windows(2) {
        let (d0, v0) = window[0];
        let (d1, v1) = window[1];
        let gap = (d1 - d0).num_days();

        for _ in 1..gap {
            series.push(v0);
            filled += 1;
        }
        series.push(v1);
    }

    debug!("Forward-filled {} of {} days", filled, series.len());

    Some(series)
}

/// Fill missing days by linear interpolation between the nearest known days.
///
/// Returns `None` when the input holds no finite value.
pub fn interpolate(sparse: &BTreeMap<NaiveDate, f64>) -> Option<DailySeries> {
    let known = finite_points(sparse);
    let (start, first) = *known.first()?;

    let mut series = DailySeries::new(start, vec![first]);
    let mut filled = 0usize;

    for window in known.windows(2) {
        let (d0, v0) = window[0];
        let (d1, v1) = window[1];
        let gap = (d1 - d0).num_days();

        for step in 1..gap {
            let weight = step as f64 / gap as f64;
            series.push(v0 + (v1 - v0) * weight);
            filled += 1;
        }
        series.push(v1);
    }

    debug!("Interpolated {} of {} days", filled, series.len());

    Some(series)
}

/// Average all observations falling on the same UTC calendar day.
pub fn daily_mean(points: &[PricePoint]) -> BTreeMap<NaiveDate, f64> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for point in points.iter().filter(|p| p.value.is_finite()) {
        if let Some(date) = point.date() {
            let entry = buckets.entry(date).or_insert((0.0, 0));
            entry.0 += point.value;
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, (sum, count))| (date, sum / count as f64))
        .collect()
}

/// Resample timestamped prices onto a dense daily calendar.
pub fn interpolate_daily(points: &[PricePoint]) -> Option<DailySeries> {
    interpolate(&daily_mean(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn midnight_ms(d: NaiveDate) -> i64 {
        d.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis()
    }

    fn assert_gap_free(series: &DailySeries, first: NaiveDate, last: NaiveDate) {
        assert_eq!(series.first_date(), Some(first));
        assert_eq!(series.last_date(), Some(last));
        assert_eq!(series.len() as i64, (last - first).num_days() + 1);
    }

    #[test]
    fn test_forward_fill() {
        let sparse = BTreeMap::from([
            (date(2024, 1, 1), 0.20),
            (date(2024, 1, 4), 0.25),
            (date(2024, 1, 5), f64::NAN),
            (date(2024, 1, 6), 0.30),
        ]);

        let series = forward_fill(&sparse).unwrap();

        assert_gap_free(&series, date(2024, 1, 1), date(2024, 1, 6));
        assert_eq!(series.values(), &[0.20, 0.20, 0.20, 0.25, 0.25, 0.30]);
    }

    #[test]
    fn test_forward_fill_empty() {
        assert!(forward_fill(&BTreeMap::new()).is_none());

        let only_nan = BTreeMap::from([(date(2024, 1, 1), f64::NAN)]);
        assert!(forward_fill(&only_nan).is_none());
    }

    #[test]
    fn test_interpolate_is_time_weighted() {
        let sparse = BTreeMap::from([(date(2024, 1, 1), 100.0), (date(2024, 1, 5), 140.0)]);

        let series = interpolate(&sparse).unwrap();

        assert_gap_free(&series, date(2024, 1, 1), date(2024, 1, 5));
        let expected = [100.0, 110.0, 120.0, 130.0, 140.0];
        for (got, want) in series.values().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_interpolate_daily_from_timestamps() {
        let d1 = date(2024, 3, 1);
        let d4 = date(2024, 3, 4);
        let points = vec![
            PricePoint::new(midnight_ms(d1), 60_000.0),
            // Two intraday observations on the last day are averaged
            PricePoint::new(midnight_ms(d4), 62_000.0),
            PricePoint::new(midnight_ms(d4) + 6 * 3_600_000, 64_000.0),
        ];

        let series = interpolate_daily(&points).unwrap();

        assert_gap_free(&series, d1, d4);
        assert_abs_diff_eq!(series.values()[0], 60_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(series.values()[1], 61_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(series.values()[2], 62_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(series.values()[3], 63_000.0, epsilon = 1e-9);
    }
}
