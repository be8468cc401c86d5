//! Dated numeric series with explicit gaps.
//!
//! Every provider (FRED, Yahoo, synthetic) hands the engine a `TimeSeries`.
//! Dates are strictly increasing; a missing observation is kept as a gap
//! (`value: None`) so that statistics can skip it instead of reading it as zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single dated observation. `None` marks a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn gap(date: NaiveDate) -> Self {
        Self { date, value: None }
    }

    /// The value if it is present and finite. NaN and infinities count as gaps.
    pub fn observed(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("observation dates must be strictly increasing: {previous} is followed by {next}")]
    NonIncreasingDates {
        previous: NaiveDate,
        next: NaiveDate,
    },
}

/// Ordered series of observations with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct TimeSeries {
    points: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from points that are already in date order.
    pub fn new(points: Vec<Observation>) -> Result<Self, SeriesError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::NonIncreasingDates {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Canonicalize provider output: sort by date, keep the last observation per date.
    pub fn from_unordered(mut points: Vec<Observation>) -> Self {
        // Stable sort keeps arrival order within a date, so the last one wins below.
        points.sort_by_key(|p| p.date);
        let mut out: Vec<Observation> = Vec::with_capacity(points.len());
        for point in points {
            match out.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => out.push(point),
            }
        }
        Self { points: out }
    }

    /// One observation per calendar day starting at `start`. NaN entries become gaps.
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let date = start + chrono::Duration::days(i as i64);
                if v.is_nan() {
                    Observation::gap(date)
                } else {
                    Observation::new(date, v)
                }
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    /// Number of points, gaps included.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over non-gap observations in date order.
    pub fn observed(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.observed().map(|v| (p.date, v)))
    }

    pub fn observed_values(&self) -> Vec<f64> {
        self.observed().map(|(_, v)| v).collect()
    }

    /// True when the series has no usable observation at all.
    pub fn is_unobserved(&self) -> bool {
        self.observed().next().is_none()
    }

    /// Most recent non-gap observation.
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.observed().map(|v| (p.date, v)))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

impl TryFrom<Vec<Observation>> for TimeSeries {
    type Error = SeriesError;

    fn try_from(points: Vec<Observation>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<TimeSeries> for Vec<Observation> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let err = TimeSeries::new(vec![Observation::new(d(2), 1.0), Observation::new(d(1), 2.0)])
            .unwrap_err();
        assert_eq!(
            err,
            SeriesError::NonIncreasingDates {
                previous: d(2),
                next: d(1)
            }
        );
    }

    #[test]
    fn rejects_duplicate_dates() {
        assert!(
            TimeSeries::new(vec![Observation::new(d(1), 1.0), Observation::new(d(1), 2.0)])
                .is_err()
        );
    }

    #[test]
    fn from_unordered_sorts_and_keeps_last_per_date() {
        let series = TimeSeries::from_unordered(vec![
            Observation::new(d(3), 3.0),
            Observation::new(d(1), 1.0),
            Observation::new(d(3), 30.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, d(1));
        assert_eq!(series.points()[1].value, Some(30.0));
    }

    #[test]
    fn gaps_and_nan_are_skipped() {
        let series = TimeSeries::new(vec![
            Observation::new(d(1), 1.0),
            Observation::gap(d(2)),
            Observation::new(d(3), f64::NAN),
            Observation::new(d(4), 4.0),
        ])
        .unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.observed_values(), vec![1.0, 4.0]);
        assert_eq!(series.latest(), Some((d(4), 4.0)));
    }

    #[test]
    fn latest_skips_trailing_gap() {
        let series = TimeSeries::from_values(d(1), &[1.0, 2.0, f64::NAN]);
        assert_eq!(series.latest(), Some((d(2), 2.0)));
        assert_eq!(series.last_date(), Some(d(3)));
    }

    #[test]
    fn all_gaps_is_unobserved() {
        let series = TimeSeries::from_values(d(1), &[f64::NAN, f64::NAN]);
        assert!(!series.is_empty());
        assert!(series.is_unobserved());
        assert_eq!(series.latest(), None);
    }

    #[test]
    fn serde_validates_order() {
        let json = r#"[{"date":"2024-01-02","value":1.0},{"date":"2024-01-01","value":null}]"#;
        assert!(serde_json::from_str::<TimeSeries>(json).is_err());

        let ok = r#"[{"date":"2024-01-01","value":1.0},{"date":"2024-01-02","value":null}]"#;
        let series: TimeSeries = serde_json::from_str(ok).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.points()[1].value.is_none());
    }
}
