//! Cached point-in-time feeds (Treasury debt, news headlines).
//!
//! These are not time series, so they bypass the parquet cache and are kept
//! as small timestamped JSON files next to it: `{cache_dir}/feed_{name}.json`.
//! The same fallback rules as the series loader apply: fresh entry, then the
//! network, then a stale entry, then nothing.

use chrono::NaiveDateTime;
use econpulse_core::data::DataError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Stamped<T> {
    key: String,
    fetched_at: NaiveDateTime,
    value: T,
}

pub struct FeedCache {
    dir: PathBuf,
}

impl FeedCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("feed_{name}.json"))
    }

    /// Cached value for `name` if it was stored under `key` and, when `ttl`
    /// is given, is younger than it.
    pub fn get<T: DeserializeOwned>(
        &self,
        name: &str,
        key: &str,
        ttl: Option<chrono::Duration>,
        now: NaiveDateTime,
    ) -> Option<T> {
        let content = fs::read_to_string(self.path(name)).ok()?;
        let stamped: Stamped<T> = serde_json::from_str(&content)
            .map_err(|e| debug!(name, error = %e, "unreadable feed cache entry"))
            .ok()?;
        if stamped.key != key {
            return None;
        }
        match ttl {
            Some(ttl) if now - stamped.fetched_at >= ttl => None,
            _ => Some(stamped.value),
        }
    }

    pub fn put<T: Serialize>(
        &self,
        name: &str,
        key: &str,
        value: &T,
        now: NaiveDateTime,
    ) -> Result<(), DataError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
        let stamped = Stamped {
            key: key.to_string(),
            fetched_at: now,
            value,
        };
        let json = serde_json::to_string_pretty(&stamped)
            .map_err(|e| DataError::CacheError(format!("feed serialization: {e}")))?;
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| DataError::CacheError(format!("feed write: {e}")))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })
    }

    /// Resolve a feed: fresh cache → `fetch` (unless offline) → stale cache.
    pub fn resolve<T, F>(
        &self,
        name: &str,
        key: &str,
        ttl: chrono::Duration,
        offline: bool,
        fetch: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, DataError>,
    {
        let now = chrono::Utc::now().naive_utc();
        if let Some(value) = self.get(name, key, Some(ttl), now) {
            debug!(name, "fresh feed cache hit");
            return Some(value);
        }

        if !offline {
            match fetch() {
                Ok(value) => {
                    if let Err(e) = self.put(name, key, &value, now) {
                        warn!(name, error = %e, "failed to cache feed");
                    }
                    return Some(value);
                }
                Err(e) => warn!(name, error = %e, "feed fetch failed"),
            }
        }

        let stale = self.get(name, key, None, now);
        if stale.is_some() && !offline {
            warn!(name, "using stale feed");
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn get_respects_key_and_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let feeds = FeedCache::new(dir.path());
        feeds.put("news", "q=jobs", &vec!["a".to_string()], now()).unwrap();

        let later = now() + chrono::Duration::minutes(5);
        let hit: Option<Vec<String>> = feeds.get("news", "q=jobs", Some(chrono::Duration::minutes(10)), later);
        assert_eq!(hit, Some(vec!["a".to_string()]));

        let expired: Option<Vec<String>> = feeds.get("news", "q=jobs", Some(chrono::Duration::minutes(1)), later);
        assert_eq!(expired, None);

        let other_key: Option<Vec<String>> = feeds.get("news", "q=fed", None, later);
        assert_eq!(other_key, None);
    }

    #[test]
    fn resolve_fetches_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let feeds = FeedCache::new(dir.path());
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok(42.0_f64)
        };

        let ttl = chrono::Duration::hours(6);
        assert_eq!(feeds.resolve("treasury", "latest", ttl, false, fetch), Some(42.0));
        assert_eq!(feeds.resolve("treasury", "latest", ttl, false, fetch), Some(42.0));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn resolve_falls_back_to_stale_when_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let feeds = FeedCache::new(dir.path());
        let old = now() - chrono::Duration::days(30);
        feeds.put("treasury", "latest", &1.5_f64, old).unwrap();

        let value: Option<f64> = feeds.resolve("treasury", "latest", chrono::Duration::hours(6), false, || {
            Err(DataError::NetworkUnreachable("down".into()))
        });
        assert_eq!(value, Some(1.5));
    }

    #[test]
    fn offline_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let feeds = FeedCache::new(dir.path());
        let value: Option<f64> = feeds.resolve("treasury", "latest", chrono::Duration::hours(6), true, || {
            panic!("fetch must not run offline")
        });
        assert_eq!(value, None);
    }
}
