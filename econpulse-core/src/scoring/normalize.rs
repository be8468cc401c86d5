//! Rolling z-score normalizer.
//!
//! Turns one raw series into a dimensionless z-score of its latest observation
//! against a trailing baseline window, then maps the directed z-score onto an
//! integer 0–100 sub-score.

use crate::domain::TimeSeries;
use serde::{Deserialize, Serialize};

/// Directed z-scores are clamped to `[-Z_CLAMP, Z_CLAMP]` before mapping.
pub const Z_CLAMP: f64 = 2.0;

/// Which way is "healthier" for a raw indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Higher raw value means healthier (payrolls, equity prices).
    HigherIsHealthier,
    /// Higher raw value means less healthy (unemployment, VIX, delinquency).
    LowerIsHealthier,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::HigherIsHealthier => 1.0,
            Direction::LowerIsHealthier => -1.0,
        }
    }
}

/// Z-score of the latest observation against the trailing `window` observations.
///
/// Gaps are dropped first. The baseline is the last `window` observations, or
/// the whole series when it is shorter (a `window` of zero also means the whole
/// series). The standard deviation is the population one (divide by N).
///
/// Returns `None` when the series is absent, has no observations, or its
/// baseline has zero variance.
pub fn zscore_latest(series: Option<&TimeSeries>, window: usize) -> Option<f64> {
    let values = series?.observed_values();
    let latest = *values.last()?;

    let baseline = if window == 0 || values.len() <= window {
        &values[..]
    } else {
        &values[values.len() - window..]
    };

    let first = baseline[0];
    if baseline.iter().all(|&v| v == first) {
        return None;
    }

    let (mean, std) = mean_and_population_std(baseline);
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some((latest - mean) / std)
}

/// Mean and population standard deviation. Caller guarantees a non-empty slice.
fn mean_and_population_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Map a raw z-score and a direction onto `0..=100`.
///
/// `round(((clamp(z * sign, -2, 2) + 2) / 4) * 100)`, ties to even.
pub fn sub_score(z: f64, direction: Direction) -> u8 {
    let directed = (z * direction.sign()).clamp(-Z_CLAMP, Z_CLAMP);
    let scaled = (directed + Z_CLAMP) / (2.0 * Z_CLAMP) * 100.0;
    scaled.round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), values)
    }

    fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "assert_approx failed: actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn absent_series_is_unavailable() {
        assert_eq!(zscore_latest(None, 10), None);
    }

    #[test]
    fn empty_series_is_unavailable() {
        assert_eq!(zscore_latest(Some(&TimeSeries::default()), 10), None);
    }

    #[test]
    fn all_gap_series_is_unavailable() {
        let s = series(&[f64::NAN, f64::NAN, f64::NAN]);
        assert_eq!(zscore_latest(Some(&s), 10), None);
    }

    #[test]
    fn single_observation_is_unavailable() {
        assert_eq!(zscore_latest(Some(&series(&[4.2])), 60), None);
    }

    #[test]
    fn constant_window_is_unavailable() {
        let s = series(&[0.1, 0.1, 0.1, 0.1]);
        assert_eq!(zscore_latest(Some(&s), 4), None);
    }

    #[test]
    fn variance_outside_window_does_not_count() {
        // Window only sees the trailing constant run.
        let s = series(&[1.0, 9.0, 5.0, 5.0, 5.0]);
        assert_eq!(zscore_latest(Some(&s), 3), None);
        assert!(zscore_latest(Some(&s), 5).is_some());
    }

    #[test]
    fn one_spike_over_flat_window() {
        let mut values = vec![10.0; 9];
        values.push(11.0);
        let z = zscore_latest(Some(&series(&values)), 10).unwrap();
        // mean 10.1, population sigma 0.3
        assert_approx(z, 3.0, 1e-9);
    }

    #[test]
    fn population_not_sample_deviation() {
        // [1, 3]: mean 2, population sigma 1 (sample sigma would be sqrt(2)).
        let z = zscore_latest(Some(&series(&[1.0, 3.0])), 2).unwrap();
        assert_approx(z, 1.0, 1e-12);
    }

    #[test]
    fn short_history_uses_full_series() {
        let s = series(&[1.0, 3.0]);
        assert_eq!(zscore_latest(Some(&s), 252), zscore_latest(Some(&s), 2));
    }

    #[test]
    fn zero_window_uses_full_series() {
        let s = series(&[1.0, 2.0, 6.0]);
        assert_eq!(zscore_latest(Some(&s), 0), zscore_latest(Some(&s), 3));
    }

    #[test]
    fn gaps_are_skipped_not_zeroed() {
        let with_gaps = series(&[1.0, f64::NAN, 3.0, f64::NAN]);
        let without = series(&[1.0, 3.0]);
        assert_eq!(
            zscore_latest(Some(&with_gaps), 10),
            zscore_latest(Some(&without), 10)
        );
    }

    #[test]
    fn latest_equal_to_mean_is_neutral() {
        let z = zscore_latest(Some(&series(&[1.0, 2.0, 3.0, 2.0])), 4).unwrap();
        assert_eq!(z, 0.0);
        assert_eq!(sub_score(z, Direction::HigherIsHealthier), 50);
        assert_eq!(sub_score(z, Direction::LowerIsHealthier), 50);
    }

    #[test]
    fn clamp_boundaries() {
        assert_eq!(sub_score(10.0, Direction::HigherIsHealthier), 100);
        assert_eq!(sub_score(-10.0, Direction::HigherIsHealthier), 0);
        assert_eq!(sub_score(10.0, Direction::LowerIsHealthier), 0);
        assert_eq!(sub_score(2.0, Direction::HigherIsHealthier), 100);
        assert_eq!(sub_score(-2.0, Direction::HigherIsHealthier), 0);
    }

    #[test]
    fn linear_mapping_inside_clamp() {
        assert_eq!(sub_score(1.0, Direction::HigherIsHealthier), 75);
        assert_eq!(sub_score(-1.0, Direction::HigherIsHealthier), 25);
        assert_eq!(sub_score(1.0, Direction::LowerIsHealthier), 25);
    }

    #[test]
    fn half_points_round_to_even() {
        // 0.02 maps to 50.5 -> 50, 0.06 maps to 51.5 -> 52
        assert_eq!(sub_score(0.02, Direction::HigherIsHealthier), 50);
        assert_eq!(sub_score(0.06, Direction::HigherIsHealthier), 52);
    }
}
