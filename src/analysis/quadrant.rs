//! Four-quadrant positioning of markets by visitor volume and spend.
//!
//! Thresholds come from the whole population of a period (every country
//! except the all-countries aggregate, with positive values on both axes),
//! taken as the median in log space and mapped back to the original scale.
//! Only the selected countries are then classified, so the lines stay put
//! while the selection changes.

use crate::config::PresentationConfig;
use crate::pipeline::processing::{PotentialRow, PotentialTable};
use crate::types::{CountryYear, SpendKey};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Keys that carry a country
pub trait CountryKeyed {
    fn country(&self) -> &str;
}

impl CountryKeyed for SpendKey {
    fn country(&self) -> &str {
        &self.country
    }
}

impl CountryKeyed for CountryYear {
    fn country(&self) -> &str {
        &self.country
    }
}

/// Which per-visitor spend drives the vertical axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendMeasure {
    Total,
    Item(String),
}

impl SpendMeasure {
    fn value<K>(&self, table: &PotentialTable<K>, row: &PotentialRow<K>) -> Option<f64> {
        match self {
            Self::Total => Some(row.avg_total_spend),
            Self::Item(item) => table.item_value(row, item),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quadrant {
    /// High visitors, high spend
    HH,
    /// Low visitors, high spend
    LH,
    /// High visitors, low spend
    HL,
    /// Low visitors, low spend
    LL,
}

impl Quadrant {
    /// Presentation order
    pub const ORDER: [Quadrant; 4] = [Self::HH, Self::LH, Self::HL, Self::LL];

    pub fn classify(visitors: f64, spend: f64, thresholds: &QuadrantThresholds) -> Self {
        let high_visitors = visitors >= thresholds.visitors;
        let high_spend = spend >= thresholds.spend;
        match (high_visitors, high_spend) {
            (true, true) => Self::HH,
            (false, true) => Self::LH,
            (true, false) => Self::HL,
            (false, false) => Self::LL,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::HH => "HH",
            Self::LH => "LH",
            Self::HL => "HL",
            Self::LL => "LL",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HH => "戦略的中核市場（量×質）",
            Self::LH => "高付加価値市場（質重視）",
            Self::HL => "量主導市場（単価改善余地）",
            Self::LL => "限定対応市場（探索・維持）",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuadrantThresholds {
    pub visitors: f64,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantPoint {
    pub country: String,
    pub visitors: f64,
    pub spend: f64,
    pub potential: f64,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantSummary {
    pub quadrant: Quadrant,
    pub name: &'static str,
    pub countries: usize,
    pub total_visitors: f64,
    pub avg_spend: f64,
    pub total_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantAnalysis {
    pub thresholds: QuadrantThresholds,
    pub points: Vec<QuadrantPoint>,
    /// Only quadrants that hold at least one point, in [`Quadrant::ORDER`]
    pub summary: Vec<QuadrantSummary>,
}

/// Classify the selected countries among the rows of one period.
///
/// `in_period` picks the rows of the period (a year, or a year and quarter).
/// Returns `None` when the period has no usable population or none of the
/// selected countries survive the positivity filter.
pub fn quadrant_analysis<K, S>(
    table: &PotentialTable<K>,
    in_period: impl Fn(&K) -> bool,
    measure: &SpendMeasure,
    selected: &[S],
    presentation: &PresentationConfig,
) -> Option<QuadrantAnalysis>
where
    K: CountryKeyed,
    S: AsRef<str>,
{
    let population: Vec<QuadrantPoint> = table
        .rows
        .iter()
        .filter(|row| in_period(&row.key))
        .filter(|row| row.key.country() != presentation.all_countries_label)
        .filter_map(|row| {
            let spend = measure.value(table, row)?;
            let potential = row.visitors * spend;
            if potential.is_nan() || row.visitors <= 0.0 || spend <= 0.0 {
                return None;
            }
            Some(QuadrantPoint {
                country: row.key.country().to_string(),
                visitors: row.visitors,
                spend,
                potential,
                quadrant: Quadrant::LL,
            })
        })
        .collect();

    let thresholds = QuadrantThresholds {
        visitors: log_median(population.iter().map(|p| p.visitors))?,
        spend: log_median(population.iter().map(|p| p.spend))?,
    };

    let points: Vec<QuadrantPoint> = population
        .into_iter()
        .filter(|p| selected.iter().any(|s| s.as_ref() == p.country))
        .map(|mut p| {
            p.quadrant = Quadrant::classify(p.visitors, p.spend, &thresholds);
            p
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let summary = Quadrant::ORDER
        .iter()
        .filter_map(|&quadrant| summarize(quadrant, &points))
        .collect();

    Some(QuadrantAnalysis {
        thresholds,
        points,
        summary,
    })
}

fn summarize(quadrant: Quadrant, points: &[QuadrantPoint]) -> Option<QuadrantSummary> {
    let members: Vec<&QuadrantPoint> = points.iter().filter(|p| p.quadrant == quadrant).collect();
    if members.is_empty() {
        return None;
    }
    let countries: BTreeSet<&str> = members.iter().map(|p| p.country.as_str()).collect();
    Some(QuadrantSummary {
        quadrant,
        name: quadrant.name(),
        countries: countries.len(),
        total_visitors: members.iter().map(|p| p.visitors).sum(),
        avg_spend: members.iter().map(|p| p.spend).sum::<f64>() / members.len() as f64,
        total_potential: members.iter().map(|p| p.potential).sum(),
    })
}

/// `exp(median(ln x))`; an even count averages the two middle logs
fn log_median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut logs: Vec<f64> = values.map(f64::ln).collect();
    if logs.is_empty() {
        return None;
    }
    logs.sort_by(f64::total_cmp);
    let mid = logs.len() / 2;
    let median = if logs.len() % 2 == 0 {
        (logs[mid - 1] + logs[mid]) / 2.0
    } else {
        logs[mid]
    };
    Some(median.exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::potential::ANNUAL_VISITORS;

    fn row(
        year: i32,
        country: &str,
        visitors: f64,
        spend: f64,
        item: f64,
    ) -> PotentialRow<CountryYear> {
        PotentialRow {
            key: CountryYear {
                year,
                country: country.to_string(),
            },
            visitors,
            avg_total_spend: spend,
            items: vec![item],
            potential: visitors * spend,
        }
    }

    fn table() -> PotentialTable<CountryYear> {
        PotentialTable {
            visitors_column: ANNUAL_VISITORS,
            items: vec!["宿泊費 [全体]".to_string()],
            rows: vec![
                row(2023, "全国籍･地域", 1_000_000.0, 10.0, 1.0),
                row(2023, "韓国", 10_000.0, 100.0, 40.0),
                row(2023, "米国", 100.0, 10_000.0, 0.0),
                row(2023, "台湾", 1_000.0, 1_000.0, 20.0),
                row(2023, "中国", 100_000.0, 10.0, 5.0),
                row(2024, "韓国", 1.0, 1.0, 1.0),
            ],
        }
    }

    #[test]
    fn log_median_averages_middle_pair() {
        let m = log_median([10.0, 1000.0].into_iter()).unwrap();
        assert!((m - 100.0).abs() < 1e-9);
        assert!(log_median(std::iter::empty::<f64>()).is_none());
    }

    #[test]
    fn thresholds_exclude_aggregate_and_other_periods() {
        let p = PresentationConfig::default();
        let selected = ["韓国", "米国", "台湾", "中国"];
        let analysis =
            quadrant_analysis(&table(), |k| k.year == 2023, &SpendMeasure::Total, &selected, &p)
                .unwrap();

        // Even count: geometric mean of the two middle values
        assert!((analysis.thresholds.visitors - (1_000f64 * 10_000.0).sqrt()).abs() < 1e-6);
        assert!((analysis.thresholds.spend - (100f64 * 1_000.0).sqrt()).abs() < 1e-6);

        let quadrant_of = |c: &str| {
            analysis
                .points
                .iter()
                .find(|pt| pt.country == c)
                .map(|pt| pt.quadrant)
        };
        assert_eq!(quadrant_of("韓国"), Some(Quadrant::HL));
        assert_eq!(quadrant_of("米国"), Some(Quadrant::LH));
        assert_eq!(quadrant_of("台湾"), Some(Quadrant::LH));
        assert_eq!(quadrant_of("中国"), Some(Quadrant::HL));
        assert_eq!(quadrant_of("全国籍･地域"), None);
    }

    #[test]
    fn summary_follows_quadrant_order() {
        let p = PresentationConfig::default();
        let selected = ["韓国", "米国", "台湾", "中国"];
        let analysis =
            quadrant_analysis(&table(), |k| k.year == 2023, &SpendMeasure::Total, &selected, &p)
                .unwrap();

        let order: Vec<Quadrant> = analysis.summary.iter().map(|s| s.quadrant).collect();
        assert_eq!(order, vec![Quadrant::LH, Quadrant::HL]);

        let lh = &analysis.summary[0];
        assert_eq!(lh.countries, 2);
        assert_eq!(lh.total_visitors, 1_100.0);
        assert_eq!(lh.avg_spend, 5_500.0);
        assert_eq!(lh.total_potential, 2_000_000.0);
        assert_eq!(lh.name, "高付加価値市場（質重視）");
    }

    #[test]
    fn selection_does_not_move_thresholds() {
        let p = PresentationConfig::default();
        let all = quadrant_analysis(
            &table(),
            |k| k.year == 2023,
            &SpendMeasure::Total,
            &["韓国", "米国", "台湾", "中国"],
            &p,
        )
        .unwrap();
        let one =
            quadrant_analysis(&table(), |k| k.year == 2023, &SpendMeasure::Total, &["米国"], &p)
                .unwrap();
        assert_eq!(all.thresholds, one.thresholds);
        assert_eq!(one.points.len(), 1);
    }

    #[test]
    fn item_measure_drops_non_positive_spend() {
        let p = PresentationConfig::default();
        let measure = SpendMeasure::Item("宿泊費 [全体]".to_string());
        let analysis =
            quadrant_analysis(&table(), |k| k.year == 2023, &measure, &["米国", "韓国"], &p)
                .unwrap();
        // 米国 has zero lodging spend and cannot sit on a log axis
        assert_eq!(analysis.points.len(), 1);
        assert_eq!(analysis.points[0].country, "韓国");
        assert_eq!(analysis.points[0].potential, 400_000.0);
    }

    #[test]
    fn empty_selection_or_unknown_item_yields_none() {
        let p = PresentationConfig::default();
        let t = table();
        let total = SpendMeasure::Total;
        assert!(quadrant_analysis(&t, |k| k.year == 2023, &total, &["フランス"], &p).is_none());
        let unknown = SpendMeasure::Item("交通費 [全体]".to_string());
        assert!(quadrant_analysis(&t, |k| k.year == 2023, &unknown, &["韓国"], &p).is_none());
        assert!(quadrant_analysis(&t, |k| k.year == 2030, &total, &["韓国"], &p).is_none());
    }
}
