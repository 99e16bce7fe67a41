//! Market potential: visitors × official per-visitor spend.
//!
//! The yearly spend input is the mean of the quarterly rows for each
//! (year, country). It is a mean of quarterly means, not a visitor-weighted
//! annual figure, and callers should not treat it as one.

use crate::error::Result;
use crate::table::{Mean, PivotTable, TableKey};
use crate::types::{CountryYear, SpendKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub const AVG_TOTAL_SPEND: &str = "Avg_Total_Spend";
pub const MARKET_POTENTIAL: &str = "Market_Potential_Total";
pub const QUARTERLY_VISITORS: &str = "Quarterly_Visitors";
pub const ANNUAL_VISITORS: &str = "Annual_Visitors";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendInputRow {
    pub avg_total_spend: f64,
    /// One value per catalog item, in catalog order
    pub items: Vec<f64>,
}

/// Baseline spend plus itemized units keyed by time bucket
#[derive(Debug, Clone, PartialEq)]
pub struct SpendInput<K> {
    pub items: Vec<String>,
    pub rows: BTreeMap<K, SpendInputRow>,
}

/// Left join of the baseline with the item pivot; items absent for a bucket are 0.
pub fn quarterly_spend_input(
    baseline: &BTreeMap<SpendKey, f64>,
    unit_pivot: &PivotTable<SpendKey>,
    catalog: &[String],
) -> SpendInput<SpendKey> {
    let positions: Vec<Option<usize>> = catalog
        .iter()
        .map(|item| unit_pivot.column_index(item))
        .collect();

    let rows = baseline
        .iter()
        .map(|(key, &avg_total_spend)| {
            let pivot_row = unit_pivot.row(key);
            let items = positions
                .iter()
                .map(|pos| {
                    pos.zip(pivot_row)
                        .and_then(|(idx, row)| row.values[idx])
                        .unwrap_or(0.0)
                })
                .collect();
            (
                key.clone(),
                SpendInputRow {
                    avg_total_spend,
                    items,
                },
            )
        })
        .collect();

    SpendInput {
        items: catalog.to_vec(),
        rows,
    }
}

/// Collapse quarters by averaging every numeric column per (year, country)
pub fn yearly_spend_input(quarterly: &SpendInput<SpendKey>) -> SpendInput<CountryYear> {
    let width = quarterly.items.len();
    let mut groups: BTreeMap<CountryYear, (Mean, Vec<Mean>)> = BTreeMap::new();

    for (key, row) in &quarterly.rows {
        let (total, items) = groups
            .entry(CountryYear::from(key))
            .or_insert_with(|| (Mean::default(), vec![Mean::default(); width]));
        total.push(row.avg_total_spend);
        for (mean, value) in items.iter_mut().zip(&row.items) {
            mean.push(*value);
        }
    }

    let rows = groups
        .into_iter()
        .filter_map(|(key, (total, items))| {
            let avg_total_spend = total.value()?;
            let items = items.iter().map(|m| m.value().unwrap_or(0.0)).collect();
            Some((
                key,
                SpendInputRow {
                    avg_total_spend,
                    items,
                },
            ))
        })
        .collect();

    SpendInput {
        items: quarterly.items.clone(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialRow<K> {
    pub key: K,
    pub visitors: f64,
    pub avg_total_spend: f64,
    pub items: Vec<f64>,
    pub potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialTable<K> {
    /// Header used for the visitor column on export
    pub visitors_column: &'static str,
    pub items: Vec<String>,
    pub rows: Vec<PotentialRow<K>>,
}

impl<K> PotentialTable<K> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn item_value(&self, row: &PotentialRow<K>, item: &str) -> Option<f64> {
        let idx = self.items.iter().position(|i| i == item)?;
        row.items.get(idx).copied()
    }
}

impl<K: TableKey> PotentialTable<K> {
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header: Vec<String> = K::headers().into_iter().map(String::from).collect();
        header.push(self.visitors_column.to_string());
        header.push(AVG_TOTAL_SPEND.to_string());
        header.extend(self.items.iter().cloned());
        header.push(MARKET_POTENTIAL.to_string());
        out.write_record(&header)?;

        for row in &self.rows {
            out.serialize((
                row.key.fields(),
                row.visitors,
                row.avg_total_spend,
                &row.items,
                row.potential,
            ))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Inner join of visitor totals with spend input; only buckets where both
/// measurements exist produce a row.
pub fn market_potential<K: Ord + Clone>(
    visitors_column: &'static str,
    visitors: &BTreeMap<K, f64>,
    input: &SpendInput<K>,
) -> PotentialTable<K> {
    let rows = visitors
        .iter()
        .filter_map(|(key, &visitors)| {
            let spend = input.rows.get(key)?;
            if visitors.is_nan() || spend.avg_total_spend.is_nan() {
                return None;
            }
            Some(PotentialRow {
                key: key.clone(),
                visitors,
                avg_total_spend: spend.avg_total_spend,
                items: spend.items.clone(),
                potential: visitors * spend.avg_total_spend,
            })
        })
        .collect();

    PotentialTable {
        visitors_column,
        items: input.items.clone(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyAvgSpend {
    pub year: i32,
    pub country: String,
    pub avg_spend_per_visitor: f64,
}

pub fn yearly_avg_spend(input: &SpendInput<CountryYear>) -> Vec<YearlyAvgSpend> {
    input
        .rows
        .iter()
        .map(|(key, row)| YearlyAvgSpend {
            year: key.year,
            country: key.country.clone(),
            avg_spend_per_visitor: row.avg_total_spend,
        })
        .collect()
}
