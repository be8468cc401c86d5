//! Dashboard configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) is a
//! valid configuration. Secrets never live in the file: the FRED key is read
//! from the environment variable the config names.

use chrono::NaiveDate;
use econpulse_core::data::{HttpSettings, DEFAULT_NEWS_QUERY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Allowed range for the number of news headlines.
pub const NEWS_ITEMS_RANGE: std::ops::RangeInclusive<usize> = 5..=30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Default history length when no start date is given.
    pub lookback_days: u32,
    /// Name of the environment variable holding the FRED API key.
    pub fred_api_key_env: String,
    /// Root of the parquet series cache.
    pub cache_dir: PathBuf,
    /// Instruments loaded next to the statistical series.
    pub tickers: Vec<String>,
    pub ttl: CacheTtl,
    pub news: NewsConfig,
    pub http: HttpConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            lookback_days: 5 * 365,
            fred_api_key_env: "FRED_API_KEY".into(),
            cache_dir: PathBuf::from("data"),
            tickers: vec!["GLD".into(), "SPY".into(), "VTI".into()],
            ttl: CacheTtl::default(),
            news: NewsConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// How long cached data stays fresh, in minutes, per upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtl {
    pub fred_minutes: u64,
    pub prices_minutes: u64,
    pub treasury_minutes: u64,
    pub news_minutes: u64,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            fred_minutes: 60,
            prices_minutes: 15,
            treasury_minutes: 6 * 60,
            news_minutes: 10,
        }
    }
}

impl CacheTtl {
    pub fn fred(&self) -> chrono::Duration {
        minutes(self.fred_minutes)
    }

    pub fn prices(&self) -> chrono::Duration {
        minutes(self.prices_minutes)
    }

    pub fn treasury(&self) -> chrono::Duration {
        minutes(self.treasury_minutes)
    }

    pub fn news(&self) -> chrono::Duration {
        minutes(self.news_minutes)
    }
}

fn minutes(m: u64) -> chrono::Duration {
    // chrono durations are bounded by i64::MAX milliseconds.
    const MAX_MINUTES: u64 = (i64::MAX / 60_000) as u64;
    chrono::Duration::minutes(m.min(MAX_MINUTES) as i64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub query: String,
    pub items: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_NEWS_QUERY.into(),
            items: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_retries: 3,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or return the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content)
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be positive".into()));
        }
        if self.tickers.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid("at least one ticker is required".into()));
        }
        if !NEWS_ITEMS_RANGE.contains(&self.news.items) {
            return Err(ConfigError::Invalid(format!(
                "news.items must be within {}..={}, got {}",
                NEWS_ITEMS_RANGE.start(),
                NEWS_ITEMS_RANGE.end(),
                self.news.items
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// The FRED API key from the configured environment variable, if set.
    pub fn fred_api_key(&self) -> Option<String> {
        std::env::var(&self.fred_api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// `(start, end)` ending at `today` and reaching back `lookback_days`.
    pub fn default_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today - chrono::Duration::days(i64::from(self.lookback_days));
        (start, today)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs),
            max_retries: self.http.max_retries,
            ..HttpSettings::default()
        }
    }

    pub fn ticker_symbols(&self) -> Vec<&str> {
        self.tickers
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
