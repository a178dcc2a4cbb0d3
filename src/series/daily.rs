//! Dense daily series
//!
//! A [`DailySeries`] stores a start date and one value per consecutive
//! calendar day, so a gap cannot be represented.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A series with exactly one value per calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a series starting at `start` with consecutive daily values
    pub fn new(start: NaiveDate, values: Vec<f64>) -> Self {
        Self { start, values }
    }

    /// Create an empty series anchored at `start`
    pub fn empty(start: NaiveDate) -> Self {
        Self::new(start, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// First date, if the series has any values
    pub fn first_date(&self) -> Option<NaiveDate> {
        (!self.is_empty()).then_some(self.start)
    }

    /// Last date, if the series has any values
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.len()
            .checked_sub(1)
            .map(|offset| self.date_at(offset))
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Date of the value at position `idx`
    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.start + Duration::days(idx as i64)
    }

    /// Position of `date` in the series, if covered
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        usize::try_from(offset).ok().filter(|&idx| idx < self.len())
    }

    /// Value on `date`, if covered
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|idx| self.values[idx])
    }

    /// Iterate over `(date, value)` pairs in date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(idx, &value)| (self.date_at(idx), value))
    }

    /// Append the value for the day after the current last date
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Values on or before `date`
    pub fn until(&self, date: NaiveDate) -> Self {
        let end = match self.index_of(date) {
            Some(idx) => idx + 1,
            None if date < self.start => 0,
            None => self.len(),
        };
        Self::new(self.start, self.values[..end].to_vec())
    }

    /// Values strictly after `date`
    pub fn after(&self, date: NaiveDate) -> Self {
        let begin = match self.index_of(date) {
            Some(idx) => idx + 1,
            None if date < self.start => 0,
            None => self.len(),
        };
        Self::new(self.date_at(begin), self.values[begin..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dates_are_consecutive() {
        let series = DailySeries::new(date(2024, 2, 27), vec![1.0, 2.0, 3.0, 4.0]);

        let dates: Vec<NaiveDate> = series.iter().map(|(d, _)| d).collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );
        assert_eq!(series.last_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_lookup() {
        let series = DailySeries::new(date(2024, 1, 1), vec![10.0, 11.0, 12.0]);

        assert_eq!(series.get(date(2024, 1, 2)), Some(11.0));
        assert_eq!(series.get(date(2023, 12, 31)), None);
        assert_eq!(series.get(date(2024, 1, 4)), None);
    }

    #[test]
    fn test_empty_series() {
        let series = DailySeries::empty(date(2024, 1, 1));
        assert_eq!(series.first_date(), None);
        assert_eq!(series.last_date(), None);
        assert_eq!(series.last_value(), None);
    }

    #[test]
    fn test_split_at_boundary() {
        let series = DailySeries::new(date(2024, 1, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let head = series.until(date(2024, 1, 3));
        let tail = series.after(date(2024, 1, 3));

        assert_eq!(head.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(tail.values(), &[4.0, 5.0]);
        assert_eq!(tail.first_date(), Some(date(2024, 1, 4)));
    }
}
