//! Spend-survey reshaping: item catalog, unit pivot, official baseline and
//! the major-category ratio/unit table.

use crate::config::SpendRules;
use crate::constants::{OFFICIAL_TOTAL_COLUMN, RATIO_SUFFIX, UNIT_SUFFIX};
use crate::table::{Mean, PivotTable};
use crate::types::{SpendKey, SpendRecord};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Spend rows split by role
#[derive(Debug, Default)]
pub struct SpendPartition<'a> {
    /// Rows whose expense item is not an overall-total marker
    pub items: Vec<&'a SpendRecord>,
    /// Overall-total rows at major-category granularity
    pub totals: Vec<&'a SpendRecord>,
}

impl<'a> SpendPartition<'a> {
    pub fn new(records: &'a [SpendRecord], rules: &SpendRules, total_marker: &Regex) -> Self {
        let mut partition = Self::default();
        for record in records {
            if !total_marker.is_match(&record.expense_item) {
                partition.items.push(record);
            } else if record.detail == rules.all_detail_sentinel {
                partition.totals.push(record);
            }
        }
        partition
    }

    /// Item rows that aggregate a whole major category
    pub fn major_items(&self, rules: &SpendRules) -> impl Iterator<Item = &'a SpendRecord> + '_ {
        let sentinel = rules.all_detail_sentinel.clone();
        self.items
            .iter()
            .copied()
            .filter(move |r| r.detail == sentinel)
    }
}

/// `"{expense_item} [{detail}]"`, with the sentinel detail shown as the major label
pub fn item_name(record: &SpendRecord, rules: &SpendRules) -> String {
    let detail = if record.detail == rules.all_detail_sentinel {
        rules.major_label.as_str()
    } else {
        record.detail.as_str()
    };
    format!("{} [{}]", record.expense_item, detail)
}

/// Unique item names in first-seen order
pub fn item_catalog(items: &[&SpendRecord], rules: &SpendRules) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|r| item_name(r, rules))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// (year, country, quarter) × item name → consumption unit, zero-filled
pub fn unit_pivot(items: &[&SpendRecord], rules: &SpendRules) -> PivotTable<SpendKey> {
    PivotTable::from_observations(
        items
            .iter()
            .map(|r| (r.key(), item_name(r, rules), r.consumption_unit)),
    )
    .fill_missing(0.0)
}

/// Mean official total spend per (year, country, quarter). Buckets without a
/// single observed value are left out.
pub fn baseline(totals: &[&SpendRecord]) -> BTreeMap<SpendKey, f64> {
    let mut means: BTreeMap<SpendKey, Mean> = BTreeMap::new();
    for r in totals {
        if let Some(unit) = r.consumption_unit {
            means.entry(r.key()).or_default().push(unit);
        }
    }
    means
        .into_iter()
        .filter_map(|(key, mean)| mean.value().map(|v| (key, v)))
        .collect()
}

/// Major-category composition ratios and units side by side, plus the
/// official baseline as `avg_total_spend_official`
pub fn ratio_unit_table(
    partition: &SpendPartition<'_>,
    rules: &SpendRules,
    baseline: &BTreeMap<SpendKey, f64>,
) -> PivotTable<SpendKey> {
    let ratios = PivotTable::from_observations(
        partition
            .major_items(rules)
            .map(|r| (r.key(), r.expense_item.clone(), r.composition_ratio)),
    )
    .fill_missing(0.0)
    .with_suffix(RATIO_SUFFIX);

    let units = PivotTable::from_observations(
        partition
            .major_items(rules)
            .map(|r| (r.key(), r.expense_item.clone(), r.consumption_unit)),
    )
    .fill_missing(0.0)
    .with_suffix(UNIT_SUFFIX);

    ratios
        .outer_merge(units)
        .fill_missing(0.0)
        .left_join_column(OFFICIAL_TOTAL_COLUMN, baseline)
}
