//! Monthly time series container and date-window views.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// An ordered, immutable sequence of (date, value) observations.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

/// A borrowed window over a [`TimeSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesView<'a> {
    dates: &'a [NaiveDate],
    values: &'a [f64],
}

impl TimeSeries {
    /// Build a series, rejecting mismatched lengths and non-increasing dates.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Dates and values must have the same length: {} vs {}",
                dates.len(),
                values.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidInput(format!(
                "Timestamps must be strictly increasing: {} followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { dates, values })
    }

    /// Build a monthly series starting at `start`.
    pub fn monthly(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = month_sequence(start, values.len())?;
        Self::new(dates, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn view(&self) -> SeriesView<'_> {
        SeriesView {
            dates: &self.dates,
            values: &self.values,
        }
    }

    /// Observations with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> SeriesView<'_> {
        self.view().between(start, end)
    }
}

impl<'a> SeriesView<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &'a [NaiveDate] {
        self.dates
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Index of `date` within the view, if present.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Observations with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> SeriesView<'a> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end).max(lo);
        SeriesView {
            dates: &self.dates[lo..hi],
            values: &self.values[lo..hi],
        }
    }

    pub fn to_series(&self) -> TimeSeries {
        TimeSeries {
            dates: self.dates.to_vec(),
            values: self.values.to_vec(),
        }
    }
}

/// Add `n` calendar months to `date`.
pub fn add_months(date: NaiveDate, n: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(n)).ok_or_else(|| {
        ForecastError::InvalidInput(format!("Date overflow adding {} months to {}", n, date))
    })
}

/// `n` consecutive monthly dates starting at `start`.
pub fn month_sequence(start: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
    (0..n).map(|i| add_months(start, i as u32)).collect()
}

/// Whole months from `from` to `to`; negative when `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let years = to.year() as i64 - from.year() as i64;
    let months = to.month() as i64 - from.month() as i64;
    years * 12 + months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_series() {
        let ts = TimeSeries::monthly(ymd(1949, 11, 1), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ts.dates(), &[ymd(1949, 11, 1), ymd(1949, 12, 1), ymd(1950, 1, 1)]);
    }

    #[test]
    fn test_rejects_non_increasing_dates() {
        let dates = vec![ymd(1950, 1, 1), ymd(1950, 1, 1)];
        assert!(TimeSeries::new(dates, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(TimeSeries::new(vec![ymd(1950, 1, 1)], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_between_is_inclusive() {
        let ts = TimeSeries::monthly(ymd(1949, 1, 1), (0..24).map(|i| i as f64).collect()).unwrap();
        let view = ts.between(ymd(1949, 3, 1), ymd(1949, 5, 1));
        assert_eq!(view.values(), &[2.0, 3.0, 4.0]);
        assert_eq!(view.first_date(), Some(ymd(1949, 3, 1)));
        assert_eq!(view.last_date(), Some(ymd(1949, 5, 1)));
    }

    #[test]
    fn test_between_outside_range_is_empty() {
        let ts = TimeSeries::monthly(ymd(1949, 1, 1), vec![1.0; 12]).unwrap();
        assert!(ts.between(ymd(1960, 1, 1), ymd(1960, 12, 1)).is_empty());
        assert!(ts.between(ymd(1949, 6, 1), ymd(1949, 2, 1)).is_empty());
    }

    #[test]
    fn test_position() {
        let ts = TimeSeries::monthly(ymd(1949, 1, 1), vec![1.0; 12]).unwrap();
        assert_eq!(ts.view().position(ymd(1949, 4, 1)), Some(3));
        assert_eq!(ts.view().position(ymd(1949, 4, 2)), None);
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(ymd(1959, 12, 1), ymd(1962, 12, 1)), 36);
        assert_eq!(months_between(ymd(1960, 1, 1), ymd(1960, 1, 1)), 0);
        assert_eq!(months_between(ymd(1960, 3, 1), ymd(1960, 1, 1)), -2);
    }
}
