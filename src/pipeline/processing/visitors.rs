use crate::table::PivotTable;
use crate::types::{CountryYear, SpendKey, VisitorRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualVisitors {
    pub year: i32,
    pub country: String,
    pub annual_visitors: f64,
}

/// Month × country visitor counts
pub fn visitor_pivot(records: &[VisitorRecord]) -> PivotTable<NaiveDate> {
    PivotTable::from_observations(records.iter().filter_map(|r| {
        r.date()
            .map(|date| (date, r.country.clone(), Some(r.visitor_count)))
    }))
}

pub fn annual_totals(records: &[VisitorRecord]) -> BTreeMap<CountryYear, f64> {
    let mut totals = BTreeMap::new();
    for r in records {
        let key = CountryYear {
            year: r.year,
            country: r.country.clone(),
        };
        *totals.entry(key).or_insert(0.0) += r.visitor_count;
    }
    totals
}

pub fn quarterly_totals(records: &[VisitorRecord]) -> BTreeMap<SpendKey, f64> {
    let mut totals = BTreeMap::new();
    for r in records {
        let Some(quarter) = r.quarter() else { continue };
        let key = SpendKey {
            year: r.year,
            country: r.country.clone(),
            quarter,
        };
        *totals.entry(key).or_insert(0.0) += r.visitor_count;
    }
    totals
}

pub fn annual_visitors(totals: &BTreeMap<CountryYear, f64>) -> Vec<AnnualVisitors> {
    totals
        .iter()
        .map(|(key, &annual_visitors)| AnnualVisitors {
            year: key.year,
            country: key.country.clone(),
            annual_visitors,
        })
        .collect()
}
