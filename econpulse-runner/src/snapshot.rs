//! Dashboard snapshot: the health score plus the summaries shown around it.
//!
//! A snapshot is a plain serializable value built from loaded data. It owns
//! all display formatting decisions (placeholders, thousands separators,
//! units) so every renderer shows the same numbers.

use chrono::{NaiveDate, NaiveDateTime};
use econpulse_core::analytics::{
    last_difference, latest_value, market_stats, normalize_index, pct_change, MarketStats,
};
use econpulse_core::data::catalog::{series_spec, ticker_label, JOB_SERIES};
use econpulse_core::data::{DataSource, DebtRecord};
use econpulse_core::scoring::{compute_health_score, ComponentResult, CompositeScore, HealthBand};
use econpulse_core::{ScoreInputs, TimeSeries};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data_loader::LoadedData;

/// Shown wherever a value is unavailable.
pub const PLACEHOLDER: &str = "—";

/// Colour hint for a card, derived from the sign of its subtitle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn from_subtitle(subtitle: &str) -> Self {
        let s = subtitle.trim();
        if s.starts_with('-') || s.contains('↓') {
            Tone::Negative
        } else if s.starts_with('+') || s.contains('↑') {
            Tone::Positive
        } else {
            Tone::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiCard {
    pub title: String,
    pub value: String,
    pub subtitle: String,
    pub tone: Tone,
}

impl KpiCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, subtitle: impl Into<String>) -> Self {
        let subtitle = subtitle.into();
        Self {
            title: title.into(),
            value: value.into(),
            tone: Tone::from_subtitle(&subtitle),
            subtitle,
        }
    }
}

// ── Number formatting ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Percent,
    Index,
    Plain,
}

/// `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn group_thousands(x: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, x.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    if x < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

/// Like [`group_thousands`] but always signed.
pub fn signed_thousands(x: f64, decimals: usize) -> String {
    if x < 0.0 {
        group_thousands(x, decimals)
    } else {
        format!("+{}", group_thousands(x, decimals))
    }
}

pub fn fmt_num(x: Option<f64>, kind: NumberKind) -> String {
    match (x, kind) {
        (None, _) => PLACEHOLDER.to_string(),
        (Some(v), NumberKind::Percent) => format!("{}%", group_thousands(v, 2)),
        (Some(v), NumberKind::Index) => group_thousands(v, 2),
        (Some(v), NumberKind::Plain) if v.abs() >= 1000.0 => group_thousands(v, 0),
        (Some(v), NumberKind::Plain) => group_thousands(v, 2),
    }
}

fn change_subtitle(change: Option<f64>, suffix: &str) -> String {
    change.map_or_else(|| PLACEHOLDER.to_string(), |c| format!("{c:+.2}% {suffix}"))
}

// ── Sections ────────────────────────────────────────────────────────

/// Summary of one statistical series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub id: String,
    pub label: String,
    pub units: String,
    pub latest: Option<f64>,
    pub latest_date: Option<NaiveDate>,
    /// Latest value minus the previous one.
    pub change: Option<f64>,
    pub observations: usize,
}

impl SeriesSummary {
    fn from_series(id: &str, series: Option<&TimeSeries>) -> Self {
        let spec = series_spec(id);
        Self {
            id: id.to_string(),
            label: spec.map_or(id, |s| s.label).to_string(),
            units: spec.map_or("", |s| s.units).to_string(),
            latest: latest_value(series),
            latest_date: series.and_then(TimeSeries::latest).map(|(d, _)| d),
            change: last_difference(series),
            observations: series.map_or(0, |s| s.observed().count()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.observations > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub label: String,
    pub latest: Option<f64>,
    /// Percent change against the previous close.
    pub day_change_pct: Option<f64>,
    /// Latest value rebased so the first price in range is 100.
    pub rebased: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketsSummary {
    pub tickers: Vec<TickerSummary>,
    pub stats: Option<MarketStats>,
}

/// Where the snapshot's data came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub sources: BTreeMap<String, DataSource>,
    pub missing: Vec<String>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub generated_at: NaiveDateTime,
    pub score: CompositeScore,
    pub band: HealthBand,
    pub overview: Vec<KpiCard>,
    /// Score components, heaviest weight first.
    pub breakdown: Vec<ComponentResult>,
    pub markets: MarketsSummary,
    pub jobs: Vec<SeriesSummary>,
    pub debt: Vec<KpiCard>,
    pub provenance: Provenance,
}

/// Assemble a snapshot from loaded data and the optional Treasury reading.
pub fn build_snapshot(
    loaded: &LoadedData,
    treasury: Option<&DebtRecord>,
    generated_at: NaiveDateTime,
) -> Snapshot {
    let inputs = &loaded.inputs;
    let score = compute_health_score(inputs);

    Snapshot {
        generated_at,
        band: score.band(),
        breakdown: score.by_weight().into_iter().cloned().collect(),
        score,
        overview: overview_cards(inputs),
        markets: markets_summary(inputs),
        jobs: jobs_summary(inputs),
        debt: debt_cards(inputs, treasury),
        provenance: Provenance {
            sources: loaded.sources.clone(),
            missing: loaded.missing.clone(),
            dataset_hash: loaded.dataset_hash.clone(),
            has_synthetic: loaded.has_synthetic,
        },
    }
}

/// Headline cards: unemployment, VIX, payroll change, card delinquency, SPY.
pub fn overview_cards(inputs: &ScoreInputs) -> Vec<KpiCard> {
    let unrate = inputs.series("UNRATE");
    let vix = inputs.series("VIXCLS");
    let payems = inputs.series("PAYEMS");

    let payroll_delta = last_difference(payems)
        .map_or_else(|| PLACEHOLDER.to_string(), |d| format!("{}K", signed_thousands(d, 0)));

    vec![
        KpiCard::new(
            "Unemployment",
            fmt_num(latest_value(unrate), NumberKind::Percent),
            change_subtitle(pct_change(unrate, 1), "vs last month"),
        ),
        KpiCard::new(
            "VIX",
            fmt_num(latest_value(vix), NumberKind::Index),
            change_subtitle(pct_change(vix, 1), "vs yesterday"),
        ),
        KpiCard::new("Payrolls (MoM)", payroll_delta, "PAYEMS change"),
        KpiCard::new(
            "BNPL Proxy (CC Delinq.)",
            fmt_num(latest_value(inputs.series("DRCCLACBS")), NumberKind::Percent),
            "Consumer stress proxy",
        ),
        price_card("SPY", inputs.price("SPY")),
    ]
}

fn price_card(label: &str, series: Option<&TimeSeries>) -> KpiCard {
    match latest_value(series) {
        None => KpiCard::new(label, PLACEHOLDER, "No data"),
        Some(cur) => KpiCard::new(
            label,
            format!("${}", group_thousands(cur, 2)),
            change_subtitle(pct_change(series, 1), "day"),
        ),
    }
}

/// Latest reading of every labor-market series, in display order.
pub fn jobs_summary(inputs: &ScoreInputs) -> Vec<SeriesSummary> {
    JOB_SERIES
        .iter()
        .map(|id| SeriesSummary::from_series(id, inputs.series(id)))
        .collect()
}

/// Per-ticker latest prices plus return statistics over the whole table.
pub fn markets_summary(inputs: &ScoreInputs) -> MarketsSummary {
    let tickers = inputs
        .prices
        .iter()
        .filter(|(_, series)| !series.is_unobserved())
        .map(|(symbol, series)| TickerSummary {
            symbol: symbol.clone(),
            label: ticker_label(symbol).unwrap_or(symbol.as_str()).to_string(),
            latest: latest_value(Some(series)),
            day_change_pct: pct_change(Some(series), 1),
            rebased: latest_value(Some(&normalize_index(series, 100.0))),
        })
        .collect();

    MarketsSummary {
        tickers,
        stats: market_stats(&inputs.prices),
    }
}

/// Household and federal debt cards. GFDEBTN is reported in millions,
/// TOTALSL in billions, the Treasury figure in dollars.
pub fn debt_cards(inputs: &ScoreInputs, treasury: Option<&DebtRecord>) -> Vec<KpiCard> {
    let consumer_credit = latest_value(inputs.series("TOTALSL"))
        .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("${}B", group_thousands(v, 0)));
    let federal_debt = latest_value(inputs.series("GFDEBTN"))
        .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("${}T", group_thousands(v / 1e6, 2)));
    let penny = treasury
        .map(|r| r.total_public_debt)
        .filter(|v| *v != 0.0)
        .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("${}T", group_thousands(v / 1e12, 2)));

    vec![
        KpiCard::new(
            "Debt Service (TDSP)",
            fmt_num(latest_value(inputs.series("TDSP")), NumberKind::Percent),
            "Quarterly",
        ),
        KpiCard::new(
            "CC Delinq. (DRCCLACBS)",
            fmt_num(latest_value(inputs.series("DRCCLACBS")), NumberKind::Percent),
            "BNPL proxy",
        ),
        KpiCard::new("Consumer Credit (TOTALSL)", consumer_credit, "Monthly"),
        KpiCard::new("Federal Debt (FRED)", federal_debt, "Daily"),
        KpiCard::new("Debt to the Penny", penny, "Treasury"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(d(2024, 1, 1), values)
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0.0, 2), "0.00");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(1000.0, 0), "1,000");
        assert_eq!(group_thousands(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(-45_678.0, 0), "-45,678");
        assert_eq!(signed_thousands(256.0, 0), "+256");
        assert_eq!(signed_thousands(-1500.0, 0), "-1,500");
    }

    #[test]
    fn fmt_num_kinds() {
        assert_eq!(fmt_num(None, NumberKind::Percent), PLACEHOLDER);
        assert_eq!(fmt_num(Some(3.9), NumberKind::Percent), "3.90%");
        assert_eq!(fmt_num(Some(14.25), NumberKind::Index), "14.25");
        assert_eq!(fmt_num(Some(1500.4), NumberKind::Plain), "1,500");
        assert_eq!(fmt_num(Some(12.345), NumberKind::Plain), "12.35");
    }

    #[test]
    fn tone_follows_subtitle_sign() {
        assert_eq!(Tone::from_subtitle("+1.20% day"), Tone::Positive);
        assert_eq!(Tone::from_subtitle("-0.50% vs yesterday"), Tone::Negative);
        assert_eq!(Tone::from_subtitle("Quarterly"), Tone::Neutral);
        assert_eq!(Tone::from_subtitle(PLACEHOLDER), Tone::Neutral);
    }

    #[test]
    fn overview_cards_with_data() {
        let inputs = ScoreInputs::new()
            .with_series("UNRATE", Some(series(&[4.0, 3.8])))
            .with_series("VIXCLS", Some(series(&[20.0, 22.0])))
            .with_series("PAYEMS", Some(series(&[157_000.0, 157_256.0])))
            .with_series("DRCCLACBS", Some(series(&[3.1])))
            .with_price("SPY", series(&[500.0, 505.0]));

        let cards = overview_cards(&inputs);
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0].value, "3.80%");
        assert_eq!(cards[0].subtitle, "-5.00% vs last month");
        assert_eq!(cards[0].tone, Tone::Negative);
        assert_eq!(cards[1].subtitle, "+10.00% vs yesterday");
        assert_eq!(cards[2].value, "+256K");
        assert_eq!(cards[3].value, "3.10%");
        assert_eq!(cards[4].value, "$505.00");
        assert_eq!(cards[4].subtitle, "+1.00% day");
    }

    #[test]
    fn overview_cards_without_data_use_placeholders() {
        let cards = overview_cards(&ScoreInputs::new());
        assert!(cards.iter().all(|c| c.value == PLACEHOLDER));
        assert_eq!(cards[4].subtitle, "No data");
        assert_eq!(cards[0].subtitle, PLACEHOLDER);
    }

    #[test]
    fn debt_cards_convert_units() {
        let inputs = ScoreInputs::new()
            .with_series("TDSP", Some(series(&[11.3])))
            .with_series("TOTALSL", Some(series(&[5_012.4])))
            .with_series("GFDEBTN", Some(series(&[34_586_533.0])));
        let record = DebtRecord {
            record_date: d(2024, 6, 28),
            total_public_debt: 34_831_634_994_576.83,
        };

        let cards = debt_cards(&inputs, Some(&record));
        assert_eq!(cards[0].value, "11.30%");
        assert_eq!(cards[1].value, PLACEHOLDER);
        assert_eq!(cards[2].value, "$5,012B");
        assert_eq!(cards[3].value, "$34.59T");
        assert_eq!(cards[4].value, "$34.83T");

        assert_eq!(debt_cards(&inputs, None)[4].value, PLACEHOLDER);
    }

    #[test]
    fn jobs_summary_keeps_display_order() {
        let inputs = ScoreInputs::new()
            .with_series("ICSA", Some(series(&[220_000.0, 230_000.0])))
            .with_series("UNRATE", None);
        let jobs = jobs_summary(&inputs);
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, JOB_SERIES);
        assert!(!jobs[0].is_available());
        assert_eq!(jobs[2].latest, Some(230_000.0));
        assert_eq!(jobs[2].change, Some(10_000.0));
        assert_eq!(jobs[2].label, "Initial Jobless Claims");
    }

    #[test]
    fn markets_summary_rebases_and_labels() {
        let inputs = ScoreInputs::new()
            .with_price("SPY", series(&[400.0, 404.0, 440.0]))
            .with_price("GLD", series(&[180.0, 171.0, 189.0]));
        let markets = markets_summary(&inputs);
        assert_eq!(markets.tickers.len(), 2);
        let spy = markets.tickers.iter().find(|t| t.symbol == "SPY").unwrap();
        assert_eq!(spy.label, "S&P 500 (SPY)");
        assert!((spy.rebased.unwrap() - 110.0).abs() < 1e-9);
        let stats = markets.stats.unwrap();
        assert_eq!(stats.symbols, vec!["GLD", "SPY"]);
        assert_eq!(stats.observations, 2);
    }

    #[test]
    fn snapshot_breakdown_is_sorted_by_weight() {
        let ramp: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let loaded = LoadedData {
            inputs: ScoreInputs::new()
                .with_series("ICSA", Some(series(&ramp)))
                .with_series("UNRATE", Some(series(&ramp)))
                .with_series("PAYEMS", Some(series(&ramp))),
            sources: BTreeMap::new(),
            missing: vec!["VIXCLS".into()],
            dataset_hash: "abc".into(),
            has_synthetic: false,
        };
        let snap = build_snapshot(&loaded, None, d(2024, 6, 1).and_hms_opt(12, 0, 0).unwrap());
        let weights: Vec<f64> = snap.breakdown.iter().map(|c| c.weight).collect();
        assert_eq!(weights, vec![0.16, 0.14, 0.10]);
        assert_eq!(snap.band, HealthBand::from_score(snap.score.score));
        assert_eq!(snap.provenance.missing, vec!["VIXCLS"]);
    }
}
