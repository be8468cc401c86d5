//! Domain types shared by the scoring engine and the data layer.

pub mod series;

pub use series::{Observation, SeriesError, TimeSeries};
