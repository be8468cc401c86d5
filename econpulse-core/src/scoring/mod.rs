//! Health scoring engine.
//!
//! - `normalize`: rolling z-score of the latest observation and its 0–100 mapping
//! - `indicator`: the declarative indicator table
//! - `composite`: weighted aggregation into one score
//!
//! Everything here is pure: no I/O, no shared state, inputs borrowed immutably.

pub mod composite;
pub mod indicator;
pub mod normalize;

pub use composite::{
    compute_composite, compute_health_score, ComponentResult, CompositeScore, HealthBand,
    ScoreInputs, NEUTRAL_SCORE,
};
pub use indicator::{IndicatorSource, IndicatorSpec, HEALTH_INDICATORS};
pub use normalize::{sub_score, zscore_latest, Direction, Z_CLAMP};
