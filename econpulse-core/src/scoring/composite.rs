//! Composite aggregator.
//!
//! Walks an indicator table, normalizes every row that has data and combines
//! the sub-scores into one weighted 0–100 score. Rows without data contribute
//! neither score nor weight, so weights are renormalized over what was
//! available.

use super::indicator::{IndicatorSource, IndicatorSpec, HEALTH_INDICATORS};
use crate::domain::TimeSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score returned when no indicator had usable data.
pub const NEUTRAL_SCORE: u8 = 50;

/// Raw inputs for one scoring call.
///
/// `series` maps statistical keys to an optional series (an explicit `None`
/// and a missing key both mean "unavailable"). `prices` maps instrument
/// symbols to price history; only symbols present here can contribute
/// price-derived indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub series: BTreeMap<String, Option<TimeSeries>>,
    pub prices: BTreeMap<String, TimeSeries>,
}

impl ScoreInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, key: impl Into<String>, series: Option<TimeSeries>) -> Self {
        self.series.insert(key.into(), series);
        self
    }

    pub fn with_price(mut self, symbol: impl Into<String>, series: TimeSeries) -> Self {
        self.prices.insert(symbol.into(), series);
        self
    }

    pub fn series(&self, key: &str) -> Option<&TimeSeries> {
        self.series.get(key).and_then(Option::as_ref)
    }

    pub fn price(&self, symbol: &str) -> Option<&TimeSeries> {
        self.prices.get(symbol).filter(|s| !s.is_empty())
    }

    /// Resolve an indicator source against these inputs.
    pub fn lookup(&self, source: &IndicatorSource) -> Option<&TimeSeries> {
        match source {
            IndicatorSource::Statistical(key) => self.series(key),
            IndicatorSource::Price(symbol) => self.price(symbol),
        }
    }
}

/// Per-indicator outcome. `z` is the raw (undirected) z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub name: String,
    pub z: f64,
    pub score: u8,
    pub weight: f64,
}

/// Overall score plus the components that produced it, in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: u8,
    pub components: Vec<ComponentResult>,
}

impl CompositeScore {
    /// The degenerate result: no indicator was available.
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            components: Vec::new(),
        }
    }

    pub fn is_neutral_default(&self) -> bool {
        self.components.is_empty()
    }

    pub fn band(&self) -> HealthBand {
        HealthBand::from_score(self.score)
    }

    /// Components sorted by weight, heaviest first. Ties keep table order.
    pub fn by_weight(&self) -> Vec<&ComponentResult> {
        let mut sorted: Vec<&ComponentResult> = self.components.iter().collect();
        sorted.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Sum of the weights that actually took part in the score.
    pub fn effective_weight(&self) -> f64 {
        self.components.iter().map(|c| c.weight).sum()
    }

    /// Deterministic BLAKE3 digest over the score and every component.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[self.score]);
        for c in &self.components {
            hasher.update(c.name.as_bytes());
            hasher.update(&c.z.to_le_bytes());
            hasher.update(&[c.score]);
            hasher.update(&c.weight.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Coarse reading of an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Caution,
    Stressed,
}

impl HealthBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 67 {
            HealthBand::Healthy
        } else if score >= 45 {
            HealthBand::Caution
        } else {
            HealthBand::Stressed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthBand::Healthy => "healthy",
            HealthBand::Caution => "caution",
            HealthBand::Stressed => "stressed",
        }
    }
}

/// Score `inputs` against an arbitrary indicator table.
pub fn compute_composite(specs: &[IndicatorSpec], inputs: &ScoreInputs) -> CompositeScore {
    let components: Vec<ComponentResult> = specs
        .iter()
        .filter_map(|spec| spec.evaluate(inputs.lookup(&spec.source)))
        .collect();

    if components.is_empty() {
        return CompositeScore::neutral();
    }

    let total_weight: f64 = components.iter().map(|c| c.weight).sum();
    let weighted: f64 = components
        .iter()
        .map(|c| f64::from(c.score) * c.weight)
        .sum();

    CompositeScore {
        score: (weighted / total_weight).round_ties_even() as u8,
        components,
    }
}

/// Score `inputs` against the built-in health indicator table.
pub fn compute_health_score(inputs: &ScoreInputs) -> CompositeScore {
    compute_composite(&HEALTH_INDICATORS, inputs)
}
