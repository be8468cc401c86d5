//! econpulse runner: configuration, data loading, snapshots and reports.
//!
//! This crate builds on `econpulse-core` to provide:
//! - TOML dashboard configuration with validated defaults
//! - Series loading with cache/provider/synthetic fallback, in parallel
//! - Dashboard snapshot assembly (score, overview, markets, jobs, debt)
//! - Timestamped caching for point-in-time feeds (Treasury debt, news)
//! - Markdown, JSON and CSV reporting

pub mod config;
pub mod data_loader;
pub mod feeds;
pub mod report;
pub mod snapshot;

pub use config::{ConfigError, DashboardConfig};
pub use data_loader::{
    catalog_requests, load_series, LoadError, LoadOptions, LoadedData, Providers, SeriesKind,
    SeriesRequest,
};
pub use feeds::FeedCache;
pub use report::{
    export_components_csv, export_json, render_report, render_score, save_artifacts,
};
pub use snapshot::{build_snapshot, KpiCard, Snapshot, Tone};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<DashboardConfig>();
        assert_sync::<DashboardConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn loaded_data_is_send_sync() {
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<Providers<'static>>();
        assert_sync::<Providers<'static>>();
    }

    #[test]
    fn snapshot_is_send_sync() {
        assert_send::<Snapshot>();
        assert_sync::<Snapshot>();
    }
}
