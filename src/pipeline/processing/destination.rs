use crate::table::PivotTable;
use crate::types::DestinationRecord;
use serde::Serialize;

/// Year × prefecture visit rate (%)
pub fn destination_pivot(records: &[DestinationRecord]) -> PivotTable<i32> {
    PivotTable::from_observations(
        records
            .iter()
            .map(|r| (r.year, r.prefecture.clone(), r.visit_rate)),
    )
}

/// Each prefecture's share of the year's summed visit rates, in percent.
/// Rates overlap across prefectures, so shares rescale them to total 100.
pub fn visit_rate_shares(pivot: &PivotTable<i32>, year: i32) -> Vec<(String, f64)> {
    let Some(row) = pivot.row(&year) else {
        return Vec::new();
    };
    let total: f64 = row.values.iter().flatten().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    pivot
        .columns()
        .iter()
        .zip(&row.values)
        .filter_map(|(prefecture, rate)| rate.map(|r| (prefecture.clone(), r * 100.0 / total)))
        .collect()
}

/// What a growth ranking compares between two years
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthBasis {
    /// Raw visit rates
    VisitRate,
    /// Each year's rates rescaled to shares of 100
    Share,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefectureGrowth {
    pub prefecture: String,
    /// Percent change from the baseline year
    pub growth_rate: f64,
    pub current: f64,
    pub baseline: f64,
}

/// Prefectures that grew between `baseline_year` and `year`, fastest first,
/// at most `limit` of them.
///
/// Empty when either year is missing, the two years coincide, or a year's
/// rates sum to zero under [`GrowthBasis::Share`]. Prefectures missing in
/// either year, or with a zero baseline, are left out.
pub fn growth_ranking(
    pivot: &PivotTable<i32>,
    year: i32,
    baseline_year: i32,
    basis: GrowthBasis,
    limit: usize,
) -> Vec<PrefectureGrowth> {
    if year == baseline_year {
        return Vec::new();
    }
    let (Some(current), Some(baseline)) = (
        year_values(pivot, year, basis),
        year_values(pivot, baseline_year, basis),
    ) else {
        return Vec::new();
    };

    let mut ranked: Vec<PrefectureGrowth> = pivot
        .columns()
        .iter()
        .zip(current.iter().zip(&baseline))
        .filter_map(|(prefecture, (current, baseline))| {
            let (current, baseline) = ((*current)?, (*baseline)?);
            let growth_rate = (current - baseline) / baseline * 100.0;
            (growth_rate.is_finite() && growth_rate > 0.0).then(|| PrefectureGrowth {
                prefecture: prefecture.clone(),
                growth_rate,
                current,
                baseline,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.growth_rate.total_cmp(&a.growth_rate));
    ranked.truncate(limit);
    ranked
}

fn year_values(pivot: &PivotTable<i32>, year: i32, basis: GrowthBasis) -> Option<Vec<Option<f64>>> {
    let row = pivot.row(&year)?;
    match basis {
        GrowthBasis::VisitRate => Some(row.values.clone()),
        GrowthBasis::Share => {
            let total: f64 = row.values.iter().flatten().sum();
            (total > 0.0).then(|| {
                row.values
                    .iter()
                    .map(|v| v.map(|v| v * 100.0 / total))
                    .collect()
            })
        }
    }
}
