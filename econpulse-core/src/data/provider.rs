//! Series provider trait and structured error types.
//!
//! The SeriesProvider trait abstracts over data sources (FRED, Yahoo Finance)
//! so the loader can swap implementations and mock them in tests.

use crate::domain::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// None of these ever reach the scoring engine: the loader turns every one of
/// them into an absent series.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("series not found: {id}")]
    SeriesNotFound { id: String },

    #[error("request for '{id}' rejected with HTTP {status}: {message}")]
    Rejected {
        id: String,
        status: u16,
        message: String,
    },

    #[error("hard stop: {provider} has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped { provider: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for series '{id}'")]
    NoCachedData { id: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Fred,
    YahooFinance,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Fred => "fred",
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// Result of a successful fetch for a single series.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub id: String,
    pub series: TimeSeries,
    pub source: DataSource,
}

/// Trait for series providers.
///
/// Implementations handle the specifics of one upstream API. The cache sits
/// above this trait; providers don't know about it.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch one series (a statistical id or a ticker) over a date range.
    fn fetch(&self, id: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError>;

    /// Whether the provider is currently accepting requests (breaker closed).
    fn is_available(&self) -> bool;
}
