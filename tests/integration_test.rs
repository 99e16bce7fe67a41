use anyhow::Result;
use inbound_pipeline::analysis::quadrant::{quadrant_analysis, Quadrant, SpendMeasure};
use inbound_pipeline::pipeline::export::{ExportFormat, TableName};
use inbound_pipeline::pipeline::processing::destination::{growth_ranking, GrowthBasis};
use inbound_pipeline::types::{CountryYear, Quarter, SpendKey};
use inbound_pipeline::{
    run, ContentHash, Config, DataPaths, PipelineError, Snapshot, SnapshotCache, SpendRules,
};
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const VISITORS: &str = "\
Year,Month_Numeric,Country/Area,Visitor_Numeric
2023,1,USA,100
2023,2,USA,200
2023,4,USA,300
2023,1,韓国,1000
2023,7,韓国,500
2023,x,USA,10
2024,1,USA,150
";

const SPENDING: &str = "\
year,country,Quarter,expense_items,details,consumption_unit,composition_ratio
2023,USA,1Q,宿泊費,all,80,40
2023,USA,1Q,買物代,化粧品,10,5
2023,USA,1Q,TOTAL,all,50,
2023,USA,1Q,TOTAL,all,70,
2023,USA,2Q,宿泊費,all,60,35
2023,USA,2Q,全体,all,100,
2023,韓国,1Q,飲食費,all,20,30
2023,韓国,1Q,全体,all,40,
2023,韓国,3Q,全体,all,30,
2023,台湾,1Q,全体,all,90,
";

const DESTINATION: &str = "\
Year,Prefecture,Visit Rate(%)
2023,東京都,45.5
2023,大阪府,38.0
2024,東京都,47.1
";

const BEHAVIOR: &str = "\
Year,Country/Area,PC1,PC2,PC3
2023,韓国,0.8,-0.2,0.1
2024,韓国,0.9,,0.3
";

fn fixture(with_optional: bool) -> Result<(TempDir, DataPaths)> {
    let dir = tempdir()?;
    let paths = DataPaths::in_dir(dir.path());
    fs::write(&paths.visitors, VISITORS)?;
    fs::write(&paths.spending, SPENDING)?;
    if with_optional {
        fs::write(&paths.destination, DESTINATION)?;
        fs::write(&paths.behavior_scores, BEHAVIOR)?;
    }
    Ok((dir, paths))
}

fn load(with_optional: bool) -> Result<(TempDir, Snapshot)> {
    let (dir, paths) = fixture(with_optional)?;
    let snapshot = run(&paths, &SpendRules::default())?;
    Ok((dir, snapshot))
}

fn spend_key(year: i32, country: &str, quarter: &str) -> SpendKey {
    SpendKey {
        year,
        country: country.to_string(),
        quarter: Quarter::from_label(quarter).unwrap(),
    }
}

#[test]
fn produces_every_table() -> Result<()> {
    let (_dir, snapshot) = load(true)?;

    assert_eq!(snapshot.row_count(TableName::VisitorPivot), 5);
    assert_eq!(snapshot.row_count(TableName::AnnualVisitors), 3);
    assert_eq!(snapshot.row_count(TableName::YearlyAvgSpend), 3);
    assert_eq!(snapshot.row_count(TableName::MarketPotentialQuarterly), 4);
    assert_eq!(snapshot.row_count(TableName::MarketPotentialYearly), 2);
    assert_eq!(snapshot.row_count(TableName::RatioUnit), 3);
    assert_eq!(snapshot.row_count(TableName::DestinationPivot), 2);
    assert_eq!(snapshot.row_count(TableName::BehaviorScores), 2);
    assert_eq!(
        snapshot.spend_items,
        vec!["宿泊費 [全体]", "買物代 [化粧品]", "飲食費 [全体]"]
    );
    assert_eq!(snapshot.latest_year(), Some(2023));
    Ok(())
}

#[test]
fn annual_visitors_sum_months() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let usa = snapshot
        .annual_visitors
        .iter()
        .find(|r| r.year == 2023 && r.country == "USA")
        .unwrap();
    assert_eq!(usa.annual_visitors, 600.0);
    Ok(())
}

#[test]
fn yearly_potential_is_visitors_times_average_spend() -> Result<()> {
    let (_dir, snapshot) = load(false)?;

    for row in &snapshot.market_potential_yearly.rows {
        let visitors = snapshot
            .annual_visitors
            .iter()
            .find(|v| v.year == row.key.year && v.country == row.key.country)
            .unwrap();
        let spend = snapshot
            .yearly_avg_spend
            .iter()
            .find(|s| s.year == row.key.year && s.country == row.key.country)
            .unwrap();
        let expected = visitors.annual_visitors * spend.avg_spend_per_visitor;
        assert!((row.potential - expected).abs() < 1e-9);
    }

    let usa = &snapshot.market_potential_yearly.rows[0];
    assert_eq!(
        usa.key,
        CountryYear {
            year: 2023,
            country: "USA".to_string()
        }
    );
    // Mean of the 1Q (60) and 2Q (100) baselines
    assert_eq!(usa.avg_total_spend, 80.0);
    assert_eq!(usa.potential, 48_000.0);
    Ok(())
}

#[test]
fn quarterly_potential_keys_exist_on_both_sides() -> Result<()> {
    let (_dir, snapshot) = load(false)?;

    let keys: BTreeSet<SpendKey> = snapshot
        .market_potential_quarterly
        .rows
        .iter()
        .map(|r| r.key.clone())
        .collect();
    let expected: BTreeSet<SpendKey> = [
        spend_key(2023, "USA", "1Q"),
        spend_key(2023, "USA", "2Q"),
        spend_key(2023, "韓国", "1Q"),
        spend_key(2023, "韓国", "3Q"),
    ]
    .into_iter()
    .collect();
    assert_eq!(keys, expected);

    let usa_q1 = &snapshot.market_potential_quarterly.rows[0];
    assert_eq!(usa_q1.visitors, 300.0);
    assert_eq!(usa_q1.avg_total_spend, 60.0);
    assert_eq!(usa_q1.potential, 18_000.0);
    assert_eq!(
        snapshot
            .market_potential_quarterly
            .item_value(usa_q1, "買物代 [化粧品]"),
        Some(10.0)
    );
    Ok(())
}

#[test]
fn ratio_unit_table_carries_official_baseline() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let table = &snapshot.ratio_unit;

    let usa_q1 = spend_key(2023, "USA", "1Q");
    assert_eq!(table.get(&usa_q1, "avg_total_spend_official"), Some(60.0));
    assert_eq!(table.get(&usa_q1, "宿泊費_ratio"), Some(40.0));
    assert_eq!(table.get(&usa_q1, "飲食費_unit"), Some(0.0));
    assert!(table.column_index("買物代_ratio").is_none());
    Ok(())
}

#[test]
fn malformed_rows_are_dropped_and_reported() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let issues = &snapshot.report.issues;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].file, "visitors");
    assert_eq!(issues[0].line, 7);
    Ok(())
}

#[test]
fn absent_optional_files_yield_empty_tables() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    assert!(snapshot.destination_pivot.is_empty());
    assert!(snapshot.behavior_scores.is_empty());
    assert!(snapshot
        .report
        .sources
        .iter()
        .filter(|s| s.file == "destination" || s.file == "behavior_scores")
        .all(|s| !s.present));
    Ok(())
}

#[test]
fn optional_sources_are_reshaped_when_present() -> Result<()> {
    let (_dir, snapshot) = load(true)?;
    assert_eq!(snapshot.destination_pivot.get(&2023, "東京都"), Some(45.5));
    assert_eq!(snapshot.destination_pivot.get(&2024, "大阪府"), None);

    let scores = &snapshot.behavior_scores;
    assert_eq!(scores.components, vec!["PC1", "PC2", "PC3"]);
    assert_eq!(scores.rows[1].country, "韓国");
    assert_eq!(scores.rows[1].scores[1], None);
    Ok(())
}

#[test]
fn missing_mandatory_file_is_fatal() -> Result<()> {
    let (_dir, paths) = fixture(false)?;
    fs::remove_file(&paths.spending)?;

    match run(&paths, &SpendRules::default()) {
        Err(PipelineError::MissingFile { role, path }) => {
            assert_eq!(role, "spending");
            assert_eq!(path, paths.spending);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("load should fail without the spending file"),
    }
    Ok(())
}

#[test]
fn missing_columns_are_fatal() -> Result<()> {
    let (_dir, paths) = fixture(false)?;
    fs::write(&paths.visitors, "Year,Country/Area\n2023,USA\n")?;

    let err = run(&paths, &SpendRules::default()).err().unwrap();
    assert!(matches!(err, PipelineError::MissingColumns { .. }));
    assert!(err.to_string().contains("Month_Numeric"));
    Ok(())
}

#[test]
fn spend_without_totals_yields_empty_potential() -> Result<()> {
    let (_dir, paths) = fixture(false)?;
    fs::write(
        &paths.spending,
        "year,country,Quarter,expense_items,details,consumption_unit,composition_ratio\n\
         2023,USA,1Q,宿泊費,all,80,40\n",
    )?;

    let snapshot = run(&paths, &SpendRules::default())?;
    assert!(snapshot.market_potential_quarterly.is_empty());
    assert!(snapshot.market_potential_yearly.is_empty());
    assert!(snapshot.yearly_avg_spend.is_empty());
    assert_eq!(snapshot.spend_items, vec!["宿泊費 [全体]"]);
    assert!(snapshot.report.issues.iter().all(|i| i.file != "spending"));
    Ok(())
}

#[test]
fn disjoint_visitor_and_spend_years_yield_empty_potential() -> Result<()> {
    let (_dir, paths) = fixture(false)?;
    fs::write(
        &paths.visitors,
        "Year,Month_Numeric,Country/Area,Visitor_Numeric\n\
         2019,1,USA,100\n\
         2019,4,韓国,200\n",
    )?;

    let snapshot = run(&paths, &SpendRules::default())?;
    assert_eq!(snapshot.annual_visitors.len(), 2);
    assert_eq!(snapshot.yearly_avg_spend.len(), 3);
    assert!(snapshot.market_potential_quarterly.is_empty());
    assert!(snapshot.market_potential_yearly.is_empty());
    assert_eq!(snapshot.latest_year(), None);
    assert_eq!(snapshot.default_year(&Config::default().presentation), 2024);
    Ok(())
}

#[test]
fn reruns_are_identical() -> Result<()> {
    let (_dir, paths) = fixture(true)?;
    let first = run(&paths, &SpendRules::default())?;
    let second = run(&paths, &SpendRules::default())?;

    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    Ok(())
}

#[test]
fn csv_export_of_annual_visitors() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let mut buf = Vec::new();
    snapshot.write_table(TableName::AnnualVisitors, ExportFormat::Csv, &mut buf)?;
    let text = String::from_utf8(buf)?;
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("year,country,annual_visitors"));
    assert_eq!(lines.next(), Some("2023,USA,600.0"));
    Ok(())
}

#[test]
fn csv_exports_share_one_number_format() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let csv_of = |table: TableName| -> Result<String> {
        let mut buf = Vec::new();
        snapshot.write_table(table, ExportFormat::Csv, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    };

    let pivot = csv_of(TableName::VisitorPivot)?;
    assert_eq!(pivot.lines().next(), Some("date,USA,韓国"));
    assert_eq!(pivot.lines().nth(1), Some("2023-01-01,100.0,1000.0"));

    let yearly = csv_of(TableName::MarketPotentialYearly)?;
    assert_eq!(
        yearly.lines().nth(1),
        Some("2023,USA,600.0,80.0,70.0,5.0,0.0,48000.0")
    );
    Ok(())
}

#[test]
fn yearly_quadrants_split_volume_and_value_markets() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let presentation = Config::default().presentation;

    let analysis = quadrant_analysis(
        &snapshot.market_potential_yearly,
        |k| k.year == 2023,
        &SpendMeasure::Total,
        &["USA", "韓国"],
        &presentation,
    )
    .unwrap();

    // USA: 600 visitors at 80; 韓国: 1,500 visitors at a mean of 35
    assert!((analysis.thresholds.visitors - 900_000f64.sqrt()).abs() < 1e-6);
    assert!((analysis.thresholds.spend - 2_800f64.sqrt()).abs() < 1e-6);
    let quadrants: Vec<(&str, Quadrant)> = analysis
        .points
        .iter()
        .map(|p| (p.country.as_str(), p.quadrant))
        .collect();
    assert_eq!(quadrants, vec![("USA", Quadrant::LH), ("韓国", Quadrant::HL)]);
    Ok(())
}

#[test]
fn destination_growth_against_previous_year() -> Result<()> {
    let (_dir, snapshot) = load(true)?;
    let ranking = growth_ranking(
        &snapshot.destination_pivot,
        2024,
        2023,
        GrowthBasis::VisitRate,
        10,
    );
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].prefecture, "東京都");
    assert!((ranking[0].growth_rate - (47.1 - 45.5) / 45.5 * 100.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn json_export_of_spend_items_keeps_order() -> Result<()> {
    let (_dir, snapshot) = load(false)?;
    let mut buf = Vec::new();
    snapshot.write_table(TableName::SpendItems, ExportFormat::Json, &mut buf)?;
    let items: Vec<String> = serde_json::from_slice(&buf)?;
    assert_eq!(items, snapshot.spend_items);
    Ok(())
}

#[test]
fn content_hash_cache_reloads_on_edit() -> Result<()> {
    let (_dir, paths) = fixture(false)?;
    let cache = SnapshotCache::new(paths.clone(), SpendRules::default(), ContentHash);

    let first = cache.get()?;
    assert!(Arc::ptr_eq(&first, &cache.get()?));

    fs::write(&paths.visitors, format!("{VISITORS}2023,5,台湾,400\n"))?;
    let reloaded = cache.get()?;
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(reloaded.annual_visitors.len(), 4);
    Ok(())
}
