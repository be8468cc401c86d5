//! Multi-series time alignment.
//!
//! Given several dated series (typically the ticker price table), lay them out
//! on the union of their dates. A series without an observation on a date gets
//! a gap there; nothing is forward-filled at this stage.

use crate::domain::TimeSeries;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Series laid out column-wise on a common date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// One column per key, each the same length as `dates`.
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl AlignedSeries {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Align every series in `table` to the union of their observed dates.
pub fn align_series(table: &BTreeMap<String, TimeSeries>) -> AlignedSeries {
    let mut all_dates = BTreeSet::new();
    for series in table.values() {
        for (date, _) in series.observed() {
            all_dates.insert(date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let columns = table
        .iter()
        .map(|(key, series)| {
            let by_date: HashMap<NaiveDate, f64> = series.observed().collect();
            let column = dates.iter().map(|d| by_date.get(d).copied()).collect();
            (key.clone(), column)
        })
        .collect();

    AlignedSeries { dates, columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn union_of_dates_with_gaps() {
        let mut table = BTreeMap::new();
        table.insert(
            "SPY".to_string(),
            TimeSeries::new(vec![Observation::new(d(1), 1.0), Observation::new(d(3), 3.0)]).unwrap(),
        );
        table.insert(
            "GLD".to_string(),
            TimeSeries::new(vec![Observation::new(d(2), 20.0), Observation::new(d(3), 30.0)])
                .unwrap(),
        );

        let aligned = align_series(&table);
        assert_eq!(aligned.dates, vec![d(1), d(2), d(3)]);
        assert_eq!(aligned.columns["SPY"], vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(aligned.columns["GLD"], vec![None, Some(20.0), Some(30.0)]);
        assert_eq!(aligned.keys().collect::<Vec<_>>(), vec!["GLD", "SPY"]);
    }

    #[test]
    fn gap_only_dates_do_not_extend_axis() {
        let mut table = BTreeMap::new();
        table.insert(
            "VTI".to_string(),
            TimeSeries::new(vec![Observation::new(d(1), 1.0), Observation::gap(d(2))]).unwrap(),
        );
        let aligned = align_series(&table);
        assert_eq!(aligned.len(), 1);
    }

    #[test]
    fn empty_table() {
        let aligned = align_series(&BTreeMap::new());
        assert!(aligned.is_empty());
        assert!(aligned.columns.is_empty());
    }
}
