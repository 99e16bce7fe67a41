use anyhow::Context;
use clap::{Parser, Subcommand};
use inbound_pipeline::analysis::quadrant::{quadrant_analysis, SpendMeasure};
use inbound_pipeline::analysis::sort_countries;
use inbound_pipeline::constants::PRE_PANDEMIC_YEAR;
use inbound_pipeline::pipeline::export::{ExportFormat, TableName};
use inbound_pipeline::pipeline::processing::destination::{growth_ranking, GrowthBasis};
use inbound_pipeline::{logging, Config, LoadOnce, SnapshotCache};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "inbound_pipeline")]
#[command(about = "Prepare Japanese inbound-tourism statistics for the dashboard")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to $INBOUND_CONFIG or config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all inputs and print the size of every derived table
    Summary,
    /// Print the consumption-item catalog in picker order
    Items,
    /// Write one derived table
    Export {
        /// Table name, e.g. market_potential_yearly
        #[arg(long)]
        table: String,
        /// json or csv
        #[arg(long, default_value = "json")]
        format: String,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Place every country of one year in the visitors × spend quadrants
    Quadrants {
        /// Defaults to the latest year with market potential
        #[arg(long)]
        year: Option<i32>,
        /// Consumption item to rank by instead of total spend, e.g. "宿泊費 [全体]"
        #[arg(long)]
        item: Option<String>,
    },
    /// Prefectures with the fastest visit-rate growth
    Growth {
        /// Defaults to the latest destination year
        #[arg(long)]
        year: Option<i32>,
        /// Compare against 2019 instead of the previous year
        #[arg(long)]
        pre_pandemic: bool,
        /// Compare shares of the year's total instead of raw rates
        #[arg(long)]
        share: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    }
    .context("loading configuration")?;

    let _log_guard = logging::init_logging(&config.logging);

    let cache = SnapshotCache::from_config(&config, LoadOnce);
    let snapshot = match cache.get() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Summary => {
            println!("📊 Inbound data summary");
            for table in TableName::ALL {
                println!("   {:<28} {:>6} rows", table.as_str(), snapshot.row_count(table));
            }
            println!("   default year: {}", snapshot.default_year(&config.presentation));

            let report = &snapshot.report;
            for source in &report.sources {
                if !source.present {
                    println!("   (optional {} file absent)", source.file);
                }
            }
            if !report.issues.is_empty() {
                warn!("{} rows dropped during load", report.issues.len());
                println!("\n⚠️  Dropped rows:");
                for issue in &report.issues {
                    println!("   - {}:{} {}", issue.file, issue.line, issue.message);
                }
            }
        }
        Commands::Items => {
            for item in &snapshot.spend_items {
                println!("{item}");
            }
        }
        Commands::Export {
            table,
            format,
            output,
        } => {
            let table: TableName = table.parse()?;
            let format: ExportFormat = format.parse()?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    snapshot.write_table(table, format, &mut writer)?;
                    writer.flush()?;
                    info!("Wrote {} to {}", table, path.display());
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    snapshot.write_table(table, format, &mut lock)?;
                    lock.flush()?;
                }
            }
        }
        Commands::Quadrants { year, item } => {
            let year = year.unwrap_or_else(|| snapshot.default_year(&config.presentation));
            let measure = item.map_or(SpendMeasure::Total, SpendMeasure::Item);
            let table = &snapshot.market_potential_yearly;
            let countries: Vec<&str> = table
                .rows
                .iter()
                .filter(|r| r.key.year == year)
                .map(|r| r.key.country.as_str())
                .collect();
            let selected = sort_countries(&countries, &config.presentation);

            let Some(analysis) = quadrant_analysis(
                table,
                |k| k.year == year,
                &measure,
                &selected,
                &config.presentation,
            ) else {
                println!("No positive visitor and spend data for {year}");
                return Ok(());
            };

            println!("📈 {year} quadrants");
            println!(
                "   visitors ≥ {:.0}, spend ≥ ¥{:.0}",
                analysis.thresholds.visitors, analysis.thresholds.spend
            );
            for s in &analysis.summary {
                println!(
                    "   {} {} ({} countries) visitors {:.0}, spend ¥{:.0}, potential ¥{:.0}",
                    s.quadrant,
                    s.name,
                    s.countries,
                    s.total_visitors,
                    s.avg_spend,
                    s.total_potential
                );
            }
            for point in &analysis.points {
                println!("   - {} {}", point.quadrant, point.country);
            }
        }
        Commands::Growth {
            year,
            pre_pandemic,
            share,
            limit,
        } => {
            let pivot = &snapshot.destination_pivot;
            let Some(year) = year.or_else(|| pivot.keys().last().copied()) else {
                println!("No destination data loaded");
                return Ok(());
            };
            let baseline_year = if pre_pandemic { PRE_PANDEMIC_YEAR } else { year - 1 };
            let basis = if share {
                GrowthBasis::Share
            } else {
                GrowthBasis::VisitRate
            };

            let ranking = growth_ranking(pivot, year, baseline_year, basis, limit);
            if ranking.is_empty() {
                println!("No growth between {baseline_year} and {year}");
            }
            for (rank, g) in ranking.iter().enumerate() {
                println!(
                    "   {:>2}. {:<8} {:+7.1} %  ({:.1} → {:.1})",
                    rank + 1,
                    g.prefecture,
                    g.growth_rate,
                    g.baseline,
                    g.current
                );
            }
        }
    }

    Ok(())
}
