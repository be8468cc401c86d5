//! econpulse core: economic health scoring engine and its data layer.
//!
//! - Series domain with explicit gaps
//! - Rolling z-score normalizer and composite aggregator (pure, stateless)
//! - Summary analytics (changes, rebasing, return statistics)
//! - Providers for FRED, Yahoo Finance, Treasury Fiscal Data and GDELT
//! - Parquet series cache

pub mod analytics;
pub mod data;
pub mod domain;
pub mod scoring;

pub use domain::{Observation, SeriesError, TimeSeries};
pub use scoring::{compute_health_score, CompositeScore, ComponentResult, ScoreInputs};
