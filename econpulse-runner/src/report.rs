//! Reporting and export: Markdown, JSON and CSV artifact generation.
//!
//! - **Markdown**: human-readable report per dashboard section; the CLI prints
//!   these directly
//! - **JSON**: full snapshot serialization with schema versioning
//! - **CSV**: score components for external analysis tools
//!
//! Persisted JSON carries a `schema_version` field.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use econpulse_core::data::Headline;
use econpulse_core::scoring::{ComponentResult, CompositeScore};
use serde::Serialize;

use crate::snapshot::{
    fmt_num, group_thousands, KpiCard, MarketsSummary, NumberKind, SeriesSummary, Snapshot,
    PLACEHOLDER,
};

/// Version of the persisted snapshot layout.
pub const SCHEMA_VERSION: u32 = 1;

// ─── Markdown ───────────────────────────────────────────────────────

/// One-screen summary: score, band, overview cards and the breakdown.
pub fn render_score(snapshot: &Snapshot) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# US Economy Health Score\n\n");
    let _ = writeln!(
        md,
        "**{}/100** ({})",
        snapshot.score.score,
        snapshot.band.label()
    );
    if snapshot.score.is_neutral_default() {
        md.push_str("\nNo indicator had usable data; showing the neutral default.\n");
    }
    md.push('\n');

    md.push_str(&render_cards("Overview", &snapshot.overview));
    md.push_str(&render_breakdown(&snapshot.breakdown));
    md.push_str(&render_provenance(snapshot));
    md
}

/// Full report: every section of the snapshot.
pub fn render_report(snapshot: &Snapshot) -> String {
    let mut md = render_score(snapshot);
    md.push_str(&render_markets(&snapshot.markets));
    md.push_str(&render_jobs(&snapshot.jobs));
    md.push_str(&render_cards("Debt & BNPL", &snapshot.debt));
    md
}

pub fn render_cards(title: &str, cards: &[KpiCard]) -> String {
    let mut md = format!("## {title}\n\n| Metric | Value | Note |\n| --- | --- | --- |\n");
    for card in cards {
        let _ = writeln!(md, "| {} | {} | {} |", card.title, card.value, card.subtitle);
    }
    md.push('\n');
    md
}

pub fn render_breakdown(components: &[ComponentResult]) -> String {
    let mut md = String::from("## Health Score Breakdown\n\n");
    if components.is_empty() {
        md.push_str("No components available.\n\n");
        return md;
    }
    md.push_str("| Indicator | Score | Weight | z |\n| --- | ---: | ---: | ---: |\n");
    for c in components {
        let _ = writeln!(md, "| {} | {} | {:.2} | {:+.3} |", c.name, c.score, c.weight, c.z);
    }
    md.push('\n');
    md
}

fn render_provenance(snapshot: &Snapshot) -> String {
    let p = &snapshot.provenance;
    let mut md = String::from("## Data\n\n");
    let _ = writeln!(md, "- Generated: {}", snapshot.generated_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(md, "- Dataset hash: `{}`", p.dataset_hash);
    if p.has_synthetic {
        md.push_str("- **SYNTHETIC DATA IN USE**\n");
    }
    if !p.missing.is_empty() {
        let _ = writeln!(md, "- Unavailable: {}", p.missing.join(", "));
    }
    md.push('\n');
    md
}

fn pct_or_placeholder(x: Option<f64>) -> String {
    x.map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{:.2}%", v * 100.0))
}

pub fn render_markets(markets: &MarketsSummary) -> String {
    let mut md = String::from("## Markets\n\n");
    if markets.tickers.is_empty() {
        md.push_str("No market data returned.\n\n");
        return md;
    }

    md.push_str("| Ticker | Last | Day | Rebased (100) |\n| --- | ---: | ---: | ---: |\n");
    for t in &markets.tickers {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            t.label,
            t.latest
                .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("${}", group_thousands(v, 2))),
            t.day_change_pct
                .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:+.2}%")),
            fmt_num(t.rebased, NumberKind::Index),
        );
    }
    md.push('\n');

    if let Some(stats) = &markets.stats {
        let _ = writeln!(md, "Statistics over {} daily returns.\n", stats.observations);
        md.push_str("| Ticker | Ann. Return | Ann. Volatility |\n| --- | ---: | ---: |\n");
        for symbol in &stats.symbols {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                symbol,
                pct_or_placeholder(stats.annualized_return.get(symbol).copied().flatten()),
                pct_or_placeholder(stats.annualized_volatility.get(symbol).copied().flatten()),
            );
        }
        md.push('\n');

        md.push_str("| Correlation |");
        for symbol in &stats.symbols {
            let _ = write!(md, " {symbol} |");
        }
        md.push_str("\n| --- |");
        md.push_str(&" ---: |".repeat(stats.symbols.len()));
        md.push('\n');
        for (symbol, row) in stats.symbols.iter().zip(&stats.correlation) {
            let _ = write!(md, "| {symbol} |");
            for value in row {
                match value {
                    Some(v) => {
                        let _ = write!(md, " {v:.2} |");
                    }
                    None => {
                        let _ = write!(md, " {PLACEHOLDER} |");
                    }
                }
            }
            md.push('\n');
        }
        md.push('\n');
    }
    md
}

pub fn render_jobs(jobs: &[SeriesSummary]) -> String {
    let mut md = String::from("## Jobs\n\n| Series | Latest | As of | Change |\n| --- | ---: | --- | ---: |\n");
    for job in jobs {
        if !job.is_available() {
            let _ = writeln!(md, "| {} ({}) | {PLACEHOLDER} | not available | |", job.label, job.id);
            continue;
        }
        let latest = match job.units.as_str() {
            "%" => fmt_num(job.latest, NumberKind::Percent),
            _ => fmt_num(job.latest, NumberKind::Plain),
        };
        let change = job.change.map_or_else(String::new, |c| format!("{c:+.2}"));
        let as_of = job
            .latest_date
            .map_or_else(|| PLACEHOLDER.to_string(), |d| d.to_string());
        let _ = writeln!(md, "| {} ({}) | {latest} | {as_of} | {change} |", job.label, job.id);
    }
    md.push('\n');
    md
}

pub fn render_news(headlines: &[Headline]) -> String {
    let mut md = String::from("## News Feed\n\n");
    if headlines.is_empty() {
        md.push_str("No articles returned right now.\n");
        return md;
    }
    for h in headlines {
        let _ = writeln!(md, "- **{}**\n  {} · {}\n  {}", h.title, h.source, h.seen, h.url);
    }
    md
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct VersionedSnapshot<'a> {
    schema_version: u32,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Serialize a snapshot to pretty JSON with its schema version.
pub fn export_json(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string_pretty(&VersionedSnapshot {
        schema_version: SCHEMA_VERSION,
        snapshot,
    })
    .context("failed to serialize snapshot to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export score components as CSV, heaviest weight first.
///
/// Columns: name, score, weight, z
pub fn export_components_csv(score: &CompositeScore) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["name", "score", "weight", "z"])?;
    for c in score.by_weight() {
        let score = c.score.to_string();
        let weight = format!("{:.4}", c.weight);
        let z = format!("{:.6}", c.z);
        wtr.write_record([c.name.as_str(), score.as_str(), weight.as_str(), z.as_str()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one snapshot.
///
/// Creates `snapshot_{timestamp}/` under `output_dir` containing:
/// - `snapshot.json`: the versioned snapshot
/// - `components.csv`: score components
/// - `report.md`: the Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(snapshot: &Snapshot, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("snapshot_{}", snapshot.generated_at.format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("snapshot.json"), export_json(snapshot)?)
        .context("failed to write snapshot.json")?;
    std::fs::write(run_dir.join("components.csv"), export_components_csv(&snapshot.score)?)
        .context("failed to write components.csv")?;
    std::fs::write(run_dir.join("report.md"), render_report(snapshot))
        .context("failed to write report.md")?;

    Ok(run_dir)
}
