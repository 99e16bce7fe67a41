//! Data preparation pipeline
//!
//! One linear pass from the raw CSV exports to the nine tables the dashboard
//! reads. The result is an immutable [`Snapshot`]; callers share it behind an
//! `Arc` (see [`cache::SnapshotCache`]) and never mutate it.

pub mod cache;
pub mod export;
pub mod ingestion;
pub mod processing;

use crate::config::{Config, DataPaths, PresentationConfig, SpendRules};
use crate::error::Result;
use crate::metrics;
use crate::table::PivotTable;
use crate::types::{CountryYear, SpendKey};
use chrono::NaiveDate;
use ingestion::{readers, Parsed, RowIssue};
use processing::potential::{ANNUAL_VISITORS, QUARTERLY_VISITORS};
use processing::{
    destination, potential, spending, visitors, AnnualVisitors, BehaviorScoreTable,
    PotentialTable, SpendPartition, YearlyAvgSpend,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Per-file ingest summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub file: &'static str,
    pub present: bool,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// What the load read and what it dropped. Not one of the output tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceReport>,
    pub issues: Vec<RowIssue>,
}

impl LoadReport {
    fn record<T>(&mut self, file: &'static str, parsed: Option<&Parsed<T>>) {
        match parsed {
            Some(p) => {
                self.sources.push(SourceReport {
                    file,
                    present: true,
                    rows_read: p.rows_read,
                    rows_dropped: p.issues.len(),
                });
                self.issues.extend(p.issues.iter().cloned());
            }
            None => self.sources.push(SourceReport {
                file,
                present: false,
                rows_read: 0,
                rows_dropped: 0,
            }),
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.issues.len()
    }
}

/// The nine derived tables of one load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub visitor_pivot: PivotTable<NaiveDate>,
    pub ratio_unit: PivotTable<SpendKey>,
    pub destination_pivot: PivotTable<i32>,
    pub behavior_scores: BehaviorScoreTable,
    pub annual_visitors: Vec<AnnualVisitors>,
    pub yearly_avg_spend: Vec<YearlyAvgSpend>,
    pub market_potential_quarterly: PotentialTable<SpendKey>,
    pub market_potential_yearly: PotentialTable<CountryYear>,
    /// Consumption items in first-seen order; pickers list them this way
    pub spend_items: Vec<String>,
    #[serde(skip)]
    pub report: LoadReport,
}

impl Snapshot {
    /// Most recent year with a yearly market-potential row
    pub fn latest_year(&self) -> Option<i32> {
        self.market_potential_yearly
            .rows
            .iter()
            .map(|r| r.key.year)
            .max()
    }

    pub fn default_year(&self, presentation: &PresentationConfig) -> i32 {
        self.latest_year().unwrap_or(presentation.default_year)
    }
}

/// Run the pipeline against the configured inputs
pub fn load(config: &Config) -> Result<Snapshot> {
    run(&config.data, &config.spend)
}

/// Read every input and derive all tables.
///
/// Fails if a mandatory file is missing or lacks required columns. Absent
/// optional files produce empty tables.
#[instrument(
    skip_all,
    fields(
        visitors = %paths.visitors.display(),
        spending = %paths.spending.display()
    )
)]
pub fn run(paths: &DataPaths, rules: &SpendRules) -> Result<Snapshot> {
    let timing = metrics::time_pipeline();
    let total_marker = rules.total_marker()?;

    info!("🚀 Loading inbound data");
    let visitor_rows = readers::read_visitors(&paths.visitors)?;
    let spend_rows = readers::read_spending(&paths.spending)?;
    let destination_rows = readers::read_destination(&paths.destination)?;
    let behavior_rows = readers::read_behavior_scores(&paths.behavior_scores)?;

    let mut report = LoadReport::default();
    report.record(readers::VISITORS, Some(&visitor_rows));
    report.record(readers::SPENDING, Some(&spend_rows));
    report.record(readers::DESTINATION, destination_rows.as_ref());
    report.record(readers::BEHAVIOR_SCORES, behavior_rows.as_ref().map(|(_, p)| p));

    // Visitors
    let visitor_pivot = visitors::visitor_pivot(&visitor_rows.records);
    let annual_totals = visitors::annual_totals(&visitor_rows.records);
    let quarterly_totals = visitors::quarterly_totals(&visitor_rows.records);

    // Spending
    let partition = SpendPartition::new(&spend_rows.records, rules, &total_marker);
    let spend_items = spending::item_catalog(&partition.items, rules);
    let unit_pivot = spending::unit_pivot(&partition.items, rules);
    let baseline = spending::baseline(&partition.totals);
    if baseline.is_empty() {
        warn!("No overall-total spend rows matched; market potential will be empty");
    }

    // Market potential
    let quarterly_input = potential::quarterly_spend_input(&baseline, &unit_pivot, &spend_items);
    let yearly_input = potential::yearly_spend_input(&quarterly_input);
    let market_potential_quarterly =
        potential::market_potential(QUARTERLY_VISITORS, &quarterly_totals, &quarterly_input);
    let market_potential_yearly =
        potential::market_potential(ANNUAL_VISITORS, &annual_totals, &yearly_input);

    let ratio_unit = spending::ratio_unit_table(&partition, rules, &baseline);

    // Optional sources
    let destination_pivot = destination_rows
        .map(|parsed| destination::destination_pivot(&parsed.records))
        .unwrap_or_default();
    let behavior_scores = behavior_rows
        .map(|(components, parsed)| BehaviorScoreTable::new(components, parsed.records))
        .unwrap_or_default();

    let snapshot = Snapshot {
        visitor_pivot,
        ratio_unit,
        destination_pivot,
        behavior_scores,
        annual_visitors: visitors::annual_visitors(&annual_totals),
        yearly_avg_spend: potential::yearly_avg_spend(&yearly_input),
        market_potential_quarterly,
        market_potential_yearly,
        spend_items,
        report,
    };

    info!(
        months = snapshot.visitor_pivot.len(),
        spend_items = snapshot.spend_items.len(),
        quarterly_potential = snapshot.market_potential_quarterly.len(),
        yearly_potential = snapshot.market_potential_yearly.len(),
        dropped_rows = snapshot.report.rows_dropped(),
        elapsed_secs = timing.elapsed_secs(),
        "✅ Inbound data ready"
    );
    Ok(snapshot)
}
