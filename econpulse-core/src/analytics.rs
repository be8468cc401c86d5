//! Summary statistics shown next to the health score.
//!
//! Latest values, period-over-period changes, rebasing to an index, and
//! return statistics over the ticker price table. All helpers ignore gaps
//! and return `None` instead of dividing by zero.

use crate::data::align::align_series;
use crate::domain::{Observation, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Most recent non-gap value.
pub fn latest_value(series: Option<&TimeSeries>) -> Option<f64> {
    series?.latest().map(|(_, v)| v)
}

/// Percent change of the latest value against the value `periods` observations earlier.
pub fn pct_change(series: Option<&TimeSeries>, periods: usize) -> Option<f64> {
    let values = series?.observed_values();
    if values.len() <= periods {
        return None;
    }
    let cur = values[values.len() - 1];
    let prev = values[values.len() - periods - 1];
    if prev == 0.0 {
        return None;
    }
    Some((cur / prev - 1.0) * 100.0)
}

/// Latest value minus the one before it (e.g. monthly payroll change).
pub fn last_difference(series: Option<&TimeSeries>) -> Option<f64> {
    let values = series?.observed_values();
    match values.as_slice() {
        [.., prev, cur] => Some(cur - prev),
        _ => None,
    }
}

/// Rebase a series so its first observation equals `base`. Gaps are dropped.
///
/// A series starting at zero cannot be rebased and yields an empty series.
pub fn normalize_index(series: &TimeSeries, base: f64) -> TimeSeries {
    let mut observed = series.observed().peekable();
    let first = match observed.peek() {
        Some(&(_, v)) if v != 0.0 => v,
        _ => return TimeSeries::default(),
    };
    let points = observed
        .map(|(date, v)| Observation::new(date, v / first * base))
        .collect();
    // Dates come from an already-ordered series.
    TimeSeries::new(points).unwrap_or_default()
}

/// Return statistics over a price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Symbols in row/column order of `correlation`.
    pub symbols: Vec<String>,
    /// Number of return rows the statistics were computed from.
    pub observations: usize,
    pub annualized_return: BTreeMap<String, Option<f64>>,
    pub annualized_volatility: BTreeMap<String, Option<f64>>,
    /// Pairwise Pearson correlation of daily returns.
    pub correlation: Vec<Vec<Option<f64>>>,
}

/// Daily returns per symbol on the common date axis.
///
/// Prices are forward-filled before differencing; the leading row and rows
/// where no symbol has a return are dropped.
pub fn daily_returns(prices: &BTreeMap<String, TimeSeries>) -> BTreeMap<String, Vec<Option<f64>>> {
    let aligned = align_series(prices);
    let mut returns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

    for (symbol, column) in &aligned.columns {
        let mut last: Option<f64> = None;
        let mut out = Vec::with_capacity(column.len());
        for price in column {
            let filled = price.or(last);
            let r = match (last, filled) {
                (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                _ => None,
            };
            out.push(r);
            last = filled;
        }
        returns.insert(symbol.clone(), out);
    }

    let keep: Vec<bool> = (0..aligned.len())
        .map(|i| returns.values().any(|col| col[i].is_some()))
        .collect();
    for col in returns.values_mut() {
        let mut i = 0;
        col.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
    returns
}

/// Annualized return, volatility and correlation of the price table.
///
/// Returns `None` when no symbol has at least two prices.
pub fn market_stats(prices: &BTreeMap<String, TimeSeries>) -> Option<MarketStats> {
    let returns = daily_returns(prices);
    let observations = returns.values().next().map_or(0, Vec::len);
    if observations == 0 {
        return None;
    }

    let symbols: Vec<String> = returns.keys().cloned().collect();
    let mut annualized_return = BTreeMap::new();
    let mut annualized_volatility = BTreeMap::new();

    for (symbol, col) in &returns {
        let present: Vec<f64> = col.iter().flatten().copied().collect();
        let growth = if present.is_empty() {
            None
        } else {
            let product: f64 = present.iter().map(|r| 1.0 + r).product();
            Some(product.powf(TRADING_DAYS / observations as f64) - 1.0)
        };
        annualized_return.insert(symbol.clone(), growth);
        annualized_volatility.insert(
            symbol.clone(),
            sample_std(&present).map(|s| s * TRADING_DAYS.sqrt()),
        );
    }

    let correlation = symbols
        .iter()
        .map(|a| {
            symbols
                .iter()
                .map(|b| pearson(&returns[a], &returns[b]))
                .collect()
        })
        .collect();

    Some(MarketStats {
        symbols,
        observations,
        annualized_return,
        annualized_volatility,
        correlation,
    })
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Pearson correlation over rows where both columns are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}
