//! econpulse CLI: economic health score and dashboard summaries.
//!
//! Commands:
//! - `score`: composite health score, overview cards and breakdown
//! - `markets`: ticker prices, rebased performance, return statistics
//! - `jobs`: labor-market series
//! - `debt`: household and federal debt cards
//! - `news`: latest economy headlines
//! - `cache status`: report cached series, date ranges and sizes
//! - `cache clean`: remove series cached longer ago than a cutoff

mod logging;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use econpulse_core::data::catalog::{fred_ids, JOB_SERIES};
use econpulse_core::data::{
    CircuitBreaker, DataError, DebtRecord, FredProvider, Headline, HttpClient, NewsClient, SeriesCache,
    TreasuryClient, YahooProvider,
};
use econpulse_runner::config::NEWS_ITEMS_RANGE;
use econpulse_runner::report::{render_cards, render_jobs, render_markets, render_news};
use econpulse_runner::{
    build_snapshot, export_json, load_series, render_score, save_artifacts, DashboardConfig, FeedCache,
    LoadOptions, LoadedData, Providers, SeriesRequest, Snapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "econpulse",
    about = "econpulse: US economy health score from public data"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD). Defaults to the configured lookback.
    #[arg(long, global = true)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    end: Option<String>,

    /// Offline mode: no network access, cache only.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Use synthetic data for series that cannot be loaded.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Ignore fresh cache entries and refetch.
    #[arg(long, global = true, default_value_t = false)]
    force: bool,

    /// Cache directory. Overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Print JSON instead of Markdown.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite health score with overview and breakdown.
    Score {
        /// Also write snapshot.json, components.csv and report.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Market prices and return statistics.
    Markets,
    /// Labor-market series.
    Jobs,
    /// Debt and consumer credit cards.
    Debt,
    /// Latest economy headlines.
    News {
        /// Search query. Defaults to the configured query.
        #[arg(long)]
        query: Option<String>,

        /// Number of headlines (5-30). Defaults to the configured count.
        #[arg(long)]
        items: Option<usize>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

impl Commands {
    /// Commands whose output includes the Debt to the Penny card.
    fn uses_treasury(&self) -> bool {
        matches!(self, Commands::Score { .. } | Commands::Debt)
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached series, date ranges and sizes.
    Status,
    /// Remove series cached more than the given number of days ago.
    Clean {
        /// Remove series older than this many days.
        #[arg(long)]
        max_age_days: u64,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

/// Resolved run settings shared by every command.
struct Session {
    config: DashboardConfig,
    cache_dir: PathBuf,
    start: NaiveDate,
    end: NaiveDate,
    offline: bool,
    synthetic: bool,
    force: bool,
    json: bool,
    with_treasury: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json);

    let config = DashboardConfig::load(cli.config.as_deref())?;
    let today = chrono::Local::now().date_naive();
    let (default_start, default_end) = config.default_range(today);
    let session = Session {
        cache_dir: cli.cache_dir.unwrap_or_else(|| config.cache_dir.clone()),
        start: parse_date(cli.start.as_deref())?.unwrap_or(default_start),
        end: parse_date(cli.end.as_deref())?.unwrap_or(default_end),
        offline: cli.offline,
        synthetic: cli.synthetic,
        force: cli.force,
        json: cli.json,
        with_treasury: cli.command.uses_treasury(),
        config,
    };
    if session.start > session.end {
        bail!("--start {} is after --end {}", session.start, session.end);
    }

    match cli.command {
        Commands::Score { output_dir } => run_score(&session, output_dir.as_deref()),
        Commands::Markets => run_markets(&session),
        Commands::Jobs => run_jobs(&session),
        Commands::Debt => run_debt(&session),
        Commands::News { query, items } => run_news(&session, query, items),
        Commands::Cache { action } => match action {
            CacheAction::Status => run_cache_status(&session),
            CacheAction::Clean {
                max_age_days,
                confirm,
            } => run_cache_clean(&session, max_age_days, confirm),
        },
    }
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
    })
    .transpose()
}

// ─── Loading ────────────────────────────────────────────────────────

fn http_client(session: &Session, provider: &str) -> Result<HttpClient> {
    let breaker = Arc::new(CircuitBreaker::default_provider(provider));
    Ok(HttpClient::new(breaker, &session.config.http_settings())?)
}

fn load(session: &Session, requests: &[SeriesRequest]) -> Result<LoadedData> {
    let api_key = session.config.fred_api_key();
    if api_key.is_none() && !session.offline {
        warn!(
            env = %session.config.fred_api_key_env,
            "FRED API key not set; statistical series will come from cache only"
        );
    }
    let fred = FredProvider::new(http_client(session, "fred")?, api_key);
    let yahoo = YahooProvider::new(http_client(session, "yahoo")?);

    let providers = if session.offline {
        Providers::default()
    } else {
        Providers {
            statistical: Some(&fred),
            prices: Some(&yahoo),
        }
    };

    let opts = LoadOptions {
        start: session.start,
        end: session.end,
        offline: session.offline,
        synthetic: session.synthetic,
        force: session.force,
        statistical_ttl: session.config.ttl.fred(),
        price_ttl: session.config.ttl.prices(),
    };

    let cache = SeriesCache::new(&session.cache_dir);
    let loaded = load_series(requests, &cache, providers, &opts)?;
    if loaded.has_synthetic {
        warn!("results include SYNTHETIC data");
    }
    Ok(loaded)
}

fn statistical(ids: &[&str]) -> Vec<SeriesRequest> {
    ids.iter().copied().map(SeriesRequest::statistical).collect()
}

fn prices(session: &Session) -> Vec<SeriesRequest> {
    session
        .config
        .ticker_symbols()
        .into_iter()
        .map(SeriesRequest::price)
        .collect()
}

fn treasury_debt(session: &Session) -> Option<DebtRecord> {
    let feeds = FeedCache::new(&session.cache_dir);
    let client = match http_client(session, "treasury") {
        Ok(http) => Some(TreasuryClient::new(http)),
        Err(e) => {
            warn!(error = %e, "treasury client unavailable");
            None
        }
    };
    feeds.resolve(
        "treasury",
        "debt_to_penny",
        session.config.ttl.treasury(),
        session.offline,
        || match &client {
            Some(c) => c.debt_to_the_penny(),
            None => Err(DataError::Other("treasury client unavailable".into())),
        },
    )
}

fn snapshot(session: &Session, requests: &[SeriesRequest]) -> Result<Snapshot> {
    let loaded = load(session, requests)?;
    let treasury = if session.with_treasury {
        treasury_debt(session)
    } else {
        None
    };
    let generated_at = chrono::Local::now().naive_local();
    Ok(build_snapshot(&loaded, treasury.as_ref(), generated_at))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_score(session: &Session, output_dir: Option<&Path>) -> Result<()> {
    let mut requests = statistical(&fred_ids());
    requests.extend(prices(session));
    let snap = snapshot(session, &requests)?;

    if session.json {
        println!("{}", export_json(&snap)?);
    } else {
        print!("{}", render_score(&snap));
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&snap, dir)?;
        info!(dir = %run_dir.display(), "artifacts saved");
        if !session.json {
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }
    Ok(())
}

fn run_markets(session: &Session) -> Result<()> {
    let snap = snapshot(session, &prices(session))?;
    if session.json {
        return print_json(&snap.markets);
    }
    print!("{}", render_markets(&snap.markets));
    Ok(())
}

fn run_jobs(session: &Session) -> Result<()> {
    let snap = snapshot(session, &statistical(&JOB_SERIES))?;
    if session.json {
        return print_json(&snap.jobs);
    }
    print!("{}", render_jobs(&snap.jobs));
    Ok(())
}

fn run_debt(session: &Session) -> Result<()> {
    let snap = snapshot(session, &statistical(&["TDSP", "DRCCLACBS", "TOTALSL", "GFDEBTN"]))?;
    if session.json {
        return print_json(&snap.debt);
    }
    print!("{}", render_cards("Debt & BNPL", &snap.debt));
    Ok(())
}

fn run_news(session: &Session, query: Option<String>, items: Option<usize>) -> Result<()> {
    let query = query.unwrap_or_else(|| session.config.news.query.clone());
    let items = items.unwrap_or(session.config.news.items);
    if !NEWS_ITEMS_RANGE.contains(&items) {
        bail!(
            "--items must be within {}..={}, got {items}",
            NEWS_ITEMS_RANGE.start(),
            NEWS_ITEMS_RANGE.end()
        );
    }

    let client = NewsClient::new(http_client(session, "gdelt")?);
    let feeds = FeedCache::new(&session.cache_dir);
    let key = format!("{items}:{query}");
    let headlines: Vec<Headline> = feeds
        .resolve("news", &key, session.config.ttl.news(), session.offline, || {
            client.latest(&query, items)
        })
        .unwrap_or_default();

    if session.json {
        return print_json(&headlines);
    }
    print!("{}", render_news(&headlines));
    Ok(())
}

fn run_cache_status(session: &Session) -> Result<()> {
    let cache_dir = &session.cache_dir;
    let cache = SeriesCache::new(cache_dir);
    let entries = cache.entries();

    if session.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let now = chrono::Utc::now().naive_utc();
    let mut total_size = 0u64;
    println!("Cache: {}", cache_dir.display());
    println!("Series: {}", entries.len());
    println!();
    println!(
        "{:<10} {:<25} {:>6} {:<10} {:>8} {:>10}",
        "Series", "Date Range", "Obs", "Source", "Age", "Size"
    );
    println!("{}", "-".repeat(74));
    for meta in &entries {
        let size = dir_size(&cache_dir.join(format!("series={}", meta.id)));
        total_size += size;
        println!(
            "{:<10} {:<25} {:>6} {:<10} {:>8} {:>10}",
            meta.id,
            format!("{} to {}", meta.start_date, meta.end_date),
            meta.observation_count,
            meta.source.label(),
            format_age(meta.age(now)),
            format_size(size)
        );
    }
    println!();
    println!("Total size: {}", format_size(total_size));
    Ok(())
}

fn run_cache_clean(session: &Session, max_age_days: u64, confirm: bool) -> Result<()> {
    let cache = SeriesCache::new(&session.cache_dir);
    // chrono durations are bounded by i64::MAX milliseconds.
    let max_age = chrono::Duration::days(max_age_days.min((i64::MAX / 86_400_000) as u64) as i64);
    let now = chrono::Utc::now().naive_utc();

    let removed = cache.clean(max_age, now, confirm)?;
    if removed.is_empty() {
        println!("No series older than {max_age_days} days to remove.");
        return Ok(());
    }

    println!("Found {} series older than {max_age_days} days:", removed.len());
    for id in &removed {
        println!("  {id}");
    }

    if !confirm {
        println!();
        println!("Dry run; pass --confirm to actually delete.");
        return Ok(());
    }
    println!("Done. Removed {} series.", removed.len());
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_age(age: chrono::Duration) -> String {
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else {
        format!("{}m", age.num_minutes().max(0))
    }
}
