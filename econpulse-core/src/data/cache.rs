//! Parquet series cache.
//!
//! Layout: `{cache_dir}/series={ID}/data.parquet` plus a `meta.json` sidecar.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0, date order)
//! - Quarantine for corrupt files (`data.parquet.quarantined`)
//! - Freshness judged from the sidecar's `cached_at` against a TTL, and only
//!   for requests inside the range the entry was fetched for

use super::provider::{DataError, DataSource};
use crate::domain::{Observation, TimeSeries};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DIR_PREFIX: &str = "series=";

/// Metadata sidecar for a cached series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Non-gap observations.
    pub observation_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
    /// Range the series was fetched for. Absent when written without one.
    #[serde(default)]
    pub requested_start: Option<NaiveDate>,
    #[serde(default)]
    pub requested_end: Option<NaiveDate>,
}

impl CacheMeta {
    pub fn age(&self, now: NaiveDateTime) -> chrono::Duration {
        now - self.cached_at
    }

    /// True when `[start, end]` lies inside the fetched range (or the data
    /// range, whichever is wider).
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let from = self
            .requested_start
            .map_or(self.start_date, |d| d.min(self.start_date));
        let to = self.requested_end.map_or(self.end_date, |d| d.max(self.end_date));
        from <= start && end <= to
    }
}

/// Cache status for a single series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub id: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub observation_count: Option<usize>,
    pub cached_at: Option<NaiveDateTime>,
}

pub struct SeriesCache {
    cache_dir: PathBuf,
}

impl SeriesCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn series_dir(&self, id: &str) -> PathBuf {
        self.cache_dir.join(format!("{DIR_PREFIX}{id}"))
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.series_dir(id).join("data.parquet")
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.series_dir(id).join("meta.json")
    }

    /// Write a series to the cache, replacing any previous copy. Coverage is
    /// the series' own date range.
    pub fn write(
        &self,
        id: &str,
        series: &TimeSeries,
        source: DataSource,
    ) -> Result<CacheMeta, DataError> {
        self.write_entry(id, series, source, None)
    }

    /// Write a series fetched for `[start, end]`.
    pub fn write_fetched(
        &self,
        id: &str,
        series: &TimeSeries,
        source: DataSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CacheMeta, DataError> {
        self.write_entry(id, series, source, Some((start, end)))
    }

    fn write_entry(
        &self,
        id: &str,
        series: &TimeSeries,
        source: DataSource,
        requested: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<CacheMeta, DataError> {
        let (start_date, end_date) = match (series.first_date(), series.last_date()) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(DataError::CacheError("no observations to cache".into())),
        };

        let dir = self.series_dir(id);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let df = series_to_dataframe(series)?;
        let path = self.data_path(id);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let bytes = serde_json::to_vec(series)
            .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            id: id.to_string(),
            start_date,
            end_date,
            observation_count: series.observed().count(),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            source,
            cached_at: chrono::Utc::now().naive_utc(),
            requested_start: requested.map(|(s, _)| s),
            requested_end: requested.map(|(_, e)| e),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(id), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(id, observations = meta.observation_count, "cached series");
        Ok(meta)
    }

    /// Load a cached series. Corrupt files are quarantined and reported as missing.
    pub fn load(&self, id: &str) -> Result<TimeSeries, DataError> {
        let path = self.data_path(id);
        if !path.exists() {
            return Err(DataError::NoCachedData { id: id.to_string() });
        }

        match load_and_validate_parquet(&path) {
            Ok(series) => Ok(series),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                let _ = fs::remove_file(self.meta_path(id));
                Err(DataError::NoCachedData { id: id.to_string() })
            }
        }
    }

    pub fn get_meta(&self, id: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True when the series is cached, younger than `ttl`, and covers
    /// `[start, end]`.
    pub fn is_fresh(
        &self,
        id: &str,
        start: NaiveDate,
        end: NaiveDate,
        ttl: chrono::Duration,
        now: NaiveDateTime,
    ) -> bool {
        self.get_meta(id).is_some_and(|meta| {
            meta.age(now) < ttl && meta.covers(start, end) && self.data_path(id).exists()
        })
    }

    pub fn status(&self, ids: &[&str]) -> Vec<CacheStatus> {
        ids.iter()
            .map(|id| {
                let meta = self.get_meta(id);
                CacheStatus {
                    id: id.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    observation_count: meta.as_ref().map(|m| m.observation_count),
                    cached_at: meta.as_ref().map(|m| m.cached_at),
                }
            })
            .collect()
    }

    /// Every series with a readable sidecar, sorted by id.
    pub fn entries(&self) -> Vec<CacheMeta> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut metas: Vec<CacheMeta> = dir
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let id = name.strip_prefix(DIR_PREFIX)?;
                self.get_meta(id)
            })
            .collect();
        metas.sort_by(|a, b| a.id.cmp(&b.id));
        metas
    }

    /// Series cached longer ago than `max_age`. Deleted only when `confirm` is set.
    pub fn clean(
        &self,
        max_age: chrono::Duration,
        now: NaiveDateTime,
        confirm: bool,
    ) -> Result<Vec<String>, DataError> {
        let mut removed = Vec::new();
        for meta in self.entries() {
            if meta.age(now) <= max_age {
                continue;
            }
            if confirm {
                fs::remove_dir_all(self.series_dir(&meta.id))
                    .map_err(|e| DataError::CacheError(format!("remove {}: {e}", meta.id)))?;
            }
            removed.push(meta.id);
        }
        Ok(removed)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

// NaiveDate::default() is 1970-01-01.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn series_to_dataframe(series: &TimeSeries) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = series
        .points()
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let values: Vec<Option<f64>> = series.points().iter().map(|p| p.observed()).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("value".into(), values),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<TimeSeries, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in ["date", "value"] {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_series(&df)
}

fn dataframe_to_series(df: &DataFrame) -> Result<TimeSeries, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let dates = df.column("date").map_err(map_err)?;
    let values = df.column("value").map_err(map_err)?;
    let date_ca = dates
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let value_ca = values
        .f64()
        .map_err(|e| DataError::ParquetError(format!("value column type: {e}")))?;

    let epoch = epoch();
    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let date = epoch + chrono::Duration::days(days as i64);
        points.push(match value_ca.get(i) {
            Some(v) => Observation::new(date, v),
            None => Observation::gap(date),
        });
    }

    TimeSeries::new(points).map_err(|e| DataError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_cache_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("econpulse_cache_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_series() -> TimeSeries {
        TimeSeries::from_values(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &[3.7, f64::NAN, 3.9],
        )
    }

    #[test]
    fn write_and_load_keeps_gaps() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);

        let meta = cache.write("UNRATE", &sample_series(), DataSource::Fred).unwrap();
        // The gap is not an observation.
        assert_eq!(meta.observation_count, 2);
        assert_eq!(meta.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let loaded = cache.load("UNRATE").unwrap();
        assert_eq!(loaded, sample_series());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        assert!(matches!(
            cache.load("NOPE"),
            Err(DataError::NoCachedData { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_series_is_not_cached() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        assert!(cache
            .write("EMPTY", &TimeSeries::default(), DataSource::Fred)
            .is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        cache.write("VIXCLS", &sample_series(), DataSource::Fred).unwrap();
        fs::write(cache.data_path("VIXCLS"), b"not parquet").unwrap();

        assert!(cache.load("VIXCLS").is_err());
        assert!(dir
            .join("series=VIXCLS/data.parquet.quarantined")
            .exists());
        assert!(cache.get_meta("VIXCLS").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn freshness_and_cleaning() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        let meta = cache.write("SPY", &sample_series(), DataSource::YahooFinance).unwrap();

        let now = meta.cached_at + chrono::Duration::minutes(10);
        let (start, end) = (meta.start_date, meta.end_date);
        assert!(cache.is_fresh("SPY", start, end, chrono::Duration::minutes(15), now));
        assert!(!cache.is_fresh("SPY", start, end, chrono::Duration::minutes(5), now));
        assert!(!cache.is_fresh("GLD", start, end, chrono::Duration::minutes(15), now));

        let later = meta.cached_at + chrono::Duration::days(10);
        let preview = cache.clean(chrono::Duration::days(7), later, false).unwrap();
        assert_eq!(preview, vec!["SPY".to_string()]);
        assert_eq!(cache.entries().len(), 1);

        let removed = cache.clean(chrono::Duration::days(7), later, true).unwrap();
        assert_eq!(removed, vec!["SPY".to_string()]);
        assert!(cache.entries().is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn status_reports_missing_and_present() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        cache.write("ICSA", &sample_series(), DataSource::Fred).unwrap();

        let status = cache.status(&["ICSA", "TDSP"]);
        assert!(status[0].cached);
        assert_eq!(status[0].observation_count, Some(2));
        assert!(!status[1].cached);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn freshness_requires_coverage() {
        let dir = temp_cache_dir();
        let cache = SeriesCache::new(&dir);
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let meta = cache
            .write_fetched("UNRATE", &sample_series(), DataSource::Fred, d(1, 1), d(3, 31))
            .unwrap();
        let now = meta.cached_at;
        let ttl = chrono::Duration::hours(1);

        assert!(meta.covers(d(1, 1), d(3, 31)));
        assert!(cache.is_fresh("UNRATE", d(2, 1), d(3, 1), ttl, now));
        assert!(!cache.is_fresh("UNRATE", d(1, 1), d(6, 30), ttl, now));
        assert!(!cache.is_fresh(
            "UNRATE",
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            d(3, 31),
            ttl,
            now
        ));

        // Without a fetched range, coverage is the data range.
        let plain = cache.write("ICSA", &sample_series(), DataSource::Fred).unwrap();
        assert!(plain.covers(d(1, 1), d(1, 3)));
        assert!(!plain.covers(d(1, 1), d(1, 4)));

        let _ = fs::remove_dir_all(&dir);
    }
}
