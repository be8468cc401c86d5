//! Data retrieval and caching.
//!
//! Providers translate upstream APIs into `TimeSeries`; the loader in the
//! runner decides what to do when they fail. The scoring engine never sees
//! anything from this module except finished series.

pub mod align;
pub mod cache;
pub mod catalog;
pub mod circuit_breaker;
pub mod fred;
pub mod http;
pub mod news;
pub mod provider;
pub mod treasury;
pub mod yahoo;

pub use align::{align_series, AlignedSeries};
pub use cache::{CacheMeta, CacheStatus, SeriesCache};
pub use catalog::{SeriesSpec, FRED_SERIES, JOB_SERIES, TICKERS};
pub use circuit_breaker::CircuitBreaker;
pub use fred::FredProvider;
pub use http::{HttpClient, HttpSettings};
pub use news::{Headline, NewsClient, DEFAULT_NEWS_QUERY};
pub use provider::{DataError, DataSource, FetchResult, SeriesProvider};
pub use treasury::{DebtRecord, TreasuryClient};
pub use yahoo::YahooProvider;
