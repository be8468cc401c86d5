//! Series loading and data resolution for the dashboard.
//!
//! Given the series catalog and a ticker list, resolves every series
//! independently (in parallel) with this fallback policy:
//! 1. Fresh cache entry fetched for a range covering the request → use it
//! 2. Provider available and not offline → fetch, then write to the cache
//! 3. Any cache entry, however stale, with observations in range → use it (logged)
//!
//! Cached data is always clipped to `[start, end]`; nothing outside the
//! requested window reaches the scoring engine.
//! 4. `synthetic` enabled → generate a seeded random walk (tagged)
//! 5. Otherwise the series is absent
//!
//! A failing series never fails the load; it only shrinks what the scoring
//! engine sees. Synthetic data is a developer-only debug mode and is tagged
//! in the provenance so reports can flag it.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use econpulse_core::data::catalog::fred_ids;
use econpulse_core::data::{DataError, DataSource, SeriesCache, SeriesProvider};
use econpulse_core::{ScoreInputs, TimeSeries};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Whether a requested series is a statistical series or an instrument price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Statistical,
    Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRequest {
    pub id: String,
    pub kind: SeriesKind,
}

impl SeriesRequest {
    pub fn statistical(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SeriesKind::Statistical,
        }
    }

    pub fn price(symbol: impl Into<String>) -> Self {
        Self {
            id: symbol.into(),
            kind: SeriesKind::Price,
        }
    }
}

/// Every catalog series followed by the given tickers.
pub fn catalog_requests(tickers: &[&str]) -> Vec<SeriesRequest> {
    fred_ids()
        .into_iter()
        .map(SeriesRequest::statistical)
        .chain(tickers.iter().copied().map(SeriesRequest::price))
        .collect()
}

/// Providers used for the two kinds of series. `None` means "never fetch".
#[derive(Clone, Copy, Default)]
pub struct Providers<'a> {
    pub statistical: Option<&'a dyn SeriesProvider>,
    pub prices: Option<&'a dyn SeriesProvider>,
}

impl<'a> Providers<'a> {
    fn for_kind(&self, kind: SeriesKind) -> Option<&'a dyn SeriesProvider> {
        match kind {
            SeriesKind::Statistical => self.statistical,
            SeriesKind::Price => self.prices,
        }
    }
}

/// Options controlling how series are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start date for series.
    pub start: NaiveDate,
    /// End date for series.
    pub end: NaiveDate,
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate synthetic series when real data is unavailable.
    pub synthetic: bool,
    /// Ignore fresh cache entries and go to the provider first.
    pub force: bool,
    /// Freshness window for statistical series.
    pub statistical_ttl: chrono::Duration,
    /// Freshness window for prices.
    pub price_ttl: chrono::Duration,
}

impl LoadOptions {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            offline: false,
            synthetic: false,
            force: false,
            statistical_ttl: chrono::Duration::hours(1),
            price_ttl: chrono::Duration::minutes(15),
        }
    }

    fn ttl(&self, kind: SeriesKind) -> chrono::Duration {
        match kind {
            SeriesKind::Statistical => self.statistical_ttl,
            SeriesKind::Price => self.price_ttl,
        }
    }
}

/// Result of loading, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Scoring inputs: every statistical id is present (possibly `None`),
    /// prices only for tickers that resolved.
    pub inputs: ScoreInputs,
    /// Data source per resolved series.
    pub sources: BTreeMap<String, DataSource>,
    /// Requested series that could not be resolved, in request order.
    pub missing: Vec<String>,
    /// Dataset hash for fingerprinting (BLAKE3 over all loaded observations).
    pub dataset_hash: String,
    /// Whether any series used synthetic data.
    pub has_synthetic: bool,
}

struct Resolved {
    request: SeriesRequest,
    outcome: Option<(TimeSeries, DataSource)>,
}

/// Load every requested series with cache/provider/synthetic fallback.
pub fn load_series(
    requests: &[SeriesRequest],
    cache: &SeriesCache,
    providers: Providers<'_>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    if opts.start > opts.end {
        return Err(LoadError::InvalidRange {
            start: opts.start,
            end: opts.end,
        });
    }
    std::fs::create_dir_all(cache.cache_dir()).map_err(|e| {
        DataError::CacheError(format!("create {}: {e}", cache.cache_dir().display()))
    })?;

    let now = chrono::Utc::now().naive_utc();
    let resolved: Vec<Resolved> = requests
        .par_iter()
        .map(|request| Resolved {
            request: request.clone(),
            outcome: resolve(request, cache, providers, opts, now),
        })
        .collect();

    let mut inputs = ScoreInputs::new();
    let mut sources = BTreeMap::new();
    let mut missing = Vec::new();
    let mut has_synthetic = false;

    for Resolved { request, outcome } in resolved {
        match outcome {
            Some((series, source)) => {
                has_synthetic |= source == DataSource::Synthetic;
                sources.insert(request.id.clone(), source);
                inputs = match request.kind {
                    SeriesKind::Statistical => inputs.with_series(request.id, Some(series)),
                    SeriesKind::Price => inputs.with_price(request.id, series),
                };
            }
            None => {
                if request.kind == SeriesKind::Statistical {
                    inputs = inputs.with_series(request.id.clone(), None);
                }
                missing.push(request.id);
            }
        }
    }

    let dataset_hash = compute_dataset_hash(&inputs);
    info!(
        loaded = sources.len(),
        missing = missing.len(),
        synthetic = has_synthetic,
        "series load complete"
    );

    Ok(LoadedData {
        inputs,
        sources,
        missing,
        dataset_hash,
        has_synthetic,
    })
}

fn resolve(
    request: &SeriesRequest,
    cache: &SeriesCache,
    providers: Providers<'_>,
    opts: &LoadOptions,
    now: NaiveDateTime,
) -> Option<(TimeSeries, DataSource)> {
    let id = request.id.as_str();

    // Step 1: fresh cache
    if !opts.force && cache.is_fresh(id, opts.start, opts.end, opts.ttl(request.kind), now) {
        match cache.load(id) {
            Ok(series) => match clip(series, opts) {
                Some(series) => {
                    debug!(id, "fresh cache hit");
                    return Some((series, DataSource::Cache));
                }
                None => debug!(id, "fresh cache entry has no observations in range"),
            },
            Err(e) => warn!(id, error = %e, "fresh cache entry unreadable"),
        }
    }

    // Step 2: provider
    if !opts.offline {
        if let Some(provider) = providers.for_kind(request.kind) {
            if provider.is_available() {
                match provider.fetch(id, opts.start, opts.end) {
                    Ok(fetched) if !fetched.series.is_unobserved() => {
                        if let Err(e) = cache.write_fetched(
                            id,
                            &fetched.series,
                            fetched.source,
                            opts.start,
                            opts.end,
                        ) {
                            warn!(id, error = %e, "failed to cache fetched series");
                        }
                        return Some((fetched.series, fetched.source));
                    }
                    Ok(_) => warn!(id, provider = provider.name(), "provider returned no observations"),
                    Err(e) => warn!(id, provider = provider.name(), error = %e, "fetch failed"),
                }
            } else {
                debug!(id, provider = provider.name(), "provider unavailable, skipping fetch");
            }
        }
    }

    // Step 3: stale cache, in-range observations only
    if let Ok(series) = cache.load(id) {
        match clip(series, opts) {
            Some(series) => {
                if !opts.offline {
                    warn!(id, "using stale cached series");
                }
                return Some((series, DataSource::Cache));
            }
            None => debug!(id, start = %opts.start, end = %opts.end, "cached series has no observations in range"),
        }
    }

    // Step 4: synthetic
    if opts.synthetic {
        warn!(id, "generating synthetic data; results will be tagged as synthetic");
        let series = generate_synthetic_series(id, opts.start, opts.end);
        if !series.is_empty() {
            return Some((series, DataSource::Synthetic));
        }
    }

    // Step 5: absent
    warn!(id, "series unavailable");
    None
}

/// Restrict a cached series to the requested window. `None` when nothing
/// observed lies inside it.
fn clip(series: TimeSeries, opts: &LoadOptions) -> Option<TimeSeries> {
    let points: Vec<_> = series
        .points()
        .iter()
        .filter(|p| p.date >= opts.start && p.date <= opts.end)
        .copied()
        .collect();
    let clipped = TimeSeries::new(points).ok()?;
    (!clipped.is_unobserved()).then_some(clipped)
}

/// Deterministic BLAKE3 hash over every loaded observation.
///
/// Keys are visited in `BTreeMap` order; absent statistical series still
/// contribute their key so "missing" and "empty" hash differently from
/// "not requested".
fn compute_dataset_hash(inputs: &ScoreInputs) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut feed = |tag: &str, key: &str, series: Option<&TimeSeries>| {
        hasher.update(tag.as_bytes());
        hasher.update(key.as_bytes());
        if let Some(series) = series {
            for point in series.points() {
                hasher.update(point.date.to_string().as_bytes());
                match point.observed() {
                    Some(v) => hasher.update(&v.to_le_bytes()),
                    None => hasher.update(b"gap"),
                };
            }
        }
    };

    for (key, series) in &inputs.series {
        feed("series", key, series.as_ref());
    }
    for (symbol, series) in &inputs.prices {
        feed("price", symbol, Some(series));
    }

    hasher.finalize().to_hex().to_string()
}

/// Generate a synthetic series for testing/development.
///
/// A random walk from 100.0 on weekdays, seeded from the series id so the same
/// id always produces the same path.
pub fn generate_synthetic_series(id: &str, start: NaiveDate, end: NaiveDate) -> TimeSeries {
    use econpulse_core::Observation;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(id.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut level = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            let daily_change: f64 = rng.gen_range(-0.02..0.02);
            level *= 1.0 + daily_change;
            points.push(Observation::new(current, level));
        }
        current += chrono::Duration::days(1);
    }

    // Dates are generated strictly increasing.
    TimeSeries::new(points).unwrap_or_default()
}
