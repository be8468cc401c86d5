//! Declarative indicator table for the health score.
//!
//! Each row carries the direction/weight/window triple for one tracked signal.
//! The aggregator walks this table in order; nothing else decides which
//! indicators count.

use super::composite::ComponentResult;
use super::normalize::{sub_score, zscore_latest, Direction};
use crate::domain::TimeSeries;
use serde::Serialize;

/// Where an indicator's raw series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum IndicatorSource {
    /// Statistical series looked up by key (a FRED series id).
    Statistical(&'static str),
    /// Traded instrument looked up by symbol in the price table.
    Price(&'static str),
}

impl IndicatorSource {
    pub fn key(&self) -> &'static str {
        match self {
            IndicatorSource::Statistical(key) | IndicatorSource::Price(key) => key,
        }
    }
}

/// One row of the indicator table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSpec {
    pub name: &'static str,
    pub source: IndicatorSource,
    pub direction: Direction,
    /// Relative weight. Weights are renormalized over available indicators.
    pub weight: f64,
    /// Trailing observations used as the z-score baseline.
    pub window: usize,
}

impl IndicatorSpec {
    pub const fn new(
        name: &'static str,
        source: IndicatorSource,
        direction: Direction,
        weight: f64,
        window: usize,
    ) -> Self {
        Self {
            name,
            source,
            direction,
            weight,
            window,
        }
    }

    /// Normalize `series` under this row's parameters.
    ///
    /// `None` means the indicator is unavailable and must be left out of the
    /// composite entirely.
    pub fn evaluate(&self, series: Option<&TimeSeries>) -> Option<ComponentResult> {
        let z = zscore_latest(series, self.window)?;
        Some(ComponentResult {
            name: self.name.to_string(),
            z,
            score: sub_score(z, self.direction),
            weight: self.weight,
        })
    }
}

use Direction::{HigherIsHealthier, LowerIsHealthier};
use IndicatorSource::{Price, Statistical};

/// The health score table. Nominal weights sum to 1.0.
pub const HEALTH_INDICATORS: [IndicatorSpec; 9] = [
    IndicatorSpec::new("Unemployment (UNRATE)", Statistical("UNRATE"), LowerIsHealthier, 0.16, 60),
    IndicatorSpec::new("Payrolls (PAYEMS)", Statistical("PAYEMS"), HigherIsHealthier, 0.14, 60),
    IndicatorSpec::new("Jobless Claims (ICSA)", Statistical("ICSA"), LowerIsHealthier, 0.10, 104),
    IndicatorSpec::new("CPI (CPIAUCSL)", Statistical("CPIAUCSL"), LowerIsHealthier, 0.10, 60),
    IndicatorSpec::new("Fed Funds (FEDFUNDS)", Statistical("FEDFUNDS"), LowerIsHealthier, 0.06, 120),
    IndicatorSpec::new("SPY (price)", Price("SPY"), HigherIsHealthier, 0.10, 252),
    IndicatorSpec::new("VTI (price)", Price("VTI"), HigherIsHealthier, 0.08, 252),
    IndicatorSpec::new("VIX (VIXCLS)", Statistical("VIXCLS"), LowerIsHealthier, 0.10, 252),
    IndicatorSpec::new("CC Delinq. (DRCCLACBS)", Statistical("DRCCLACBS"), LowerIsHealthier, 0.06, 80),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn nominal_weights_sum_to_one() {
        let total: f64 = HEALTH_INDICATORS.iter().map(|s| s.weight).sum();
        assert!((total - 1.0).abs() < 1e-12, "weights sum to {total}");
    }

    #[test]
    fn every_row_is_well_formed() {
        for spec in &HEALTH_INDICATORS {
            assert!(spec.weight > 0.0, "{} has non-positive weight", spec.name);
            assert!(spec.window > 0, "{} has zero window", spec.name);
        }
    }

    #[test]
    fn names_and_keys_are_unique() {
        let names: HashSet<_> = HEALTH_INDICATORS.iter().map(|s| s.name).collect();
        let keys: HashSet<_> = HEALTH_INDICATORS.iter().map(|s| s.source.key()).collect();
        assert_eq!(names.len(), HEALTH_INDICATORS.len());
        assert_eq!(keys.len(), HEALTH_INDICATORS.len());
    }

    #[test]
    fn inverted_indicators() {
        let lower: Vec<_> = HEALTH_INDICATORS
            .iter()
            .filter(|s| s.direction == LowerIsHealthier)
            .map(|s| s.source.key())
            .collect();
        assert_eq!(
            lower,
            vec!["UNRATE", "ICSA", "CPIAUCSL", "FEDFUNDS", "VIXCLS", "DRCCLACBS"]
        );
    }

    #[test]
    fn price_rows_are_spy_and_vti() {
        let prices: Vec<_> = HEALTH_INDICATORS
            .iter()
            .filter_map(|s| match s.source {
                Price(sym) => Some((sym, s.weight, s.window)),
                Statistical(_) => None,
            })
            .collect();
        assert_eq!(prices, vec![("SPY", 0.10, 252), ("VTI", 0.08, 252)]);
    }

    #[test]
    fn evaluate_carries_row_parameters() {
        let spec = IndicatorSpec::new("Test", Statistical("T"), LowerIsHealthier, 0.25, 3);
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = TimeSeries::from_values(start, &[5.0, 1.0, 2.0, 3.0]);
        let result = spec.evaluate(Some(&series)).unwrap();
        // window [1,2,3]: mean 2, sigma sqrt(2/3), z = 1.2247
        assert_eq!(result.name, "Test");
        assert_eq!(result.weight, 0.25);
        assert!((result.z - 1.224_744_871).abs() < 1e-6);
        assert_eq!(result.score, 19);
    }

    #[test]
    fn evaluate_unavailable_without_series() {
        assert!(HEALTH_INDICATORS[0].evaluate(None).is_none());
    }
}
