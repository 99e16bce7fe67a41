//! Keyed pivot tables
//!
//! A [`PivotTable`] holds rows sorted by key and a fixed list of named numeric
//! columns. Cells are `Option<f64>`; `None` is a missing value, never zero.

use crate::error::Result;
use crate::types::{CountryYear, SpendKey};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// Running arithmetic mean that ignores missing values
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Row key that can be flattened into CSV columns
pub trait TableKey {
    fn headers() -> Vec<&'static str>;
    fn fields(&self) -> Vec<String>;
}

impl TableKey for NaiveDate {
    fn headers() -> Vec<&'static str> {
        vec!["date"]
    }

    fn fields(&self) -> Vec<String> {
        vec![self.format("%Y-%m-%d").to_string()]
    }
}

impl TableKey for i32 {
    fn headers() -> Vec<&'static str> {
        vec!["year"]
    }

    fn fields(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl TableKey for SpendKey {
    fn headers() -> Vec<&'static str> {
        vec!["year", "country", "Quarter"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.year.to_string(),
            self.country.clone(),
            self.quarter.to_string(),
        ]
    }
}

impl TableKey for CountryYear {
    fn headers() -> Vec<&'static str> {
        vec!["year", "country"]
    }

    fn fields(&self) -> Vec<String> {
        vec![self.year.to_string(), self.country.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow<K> {
    pub key: K,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable<K> {
    columns: Vec<String>,
    rows: Vec<PivotRow<K>>,
}

impl<K> Default for PivotTable<K> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<K: Ord + Clone> PivotTable<K> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pivot `(row key, column, value)` observations.
    ///
    /// Duplicate cells are averaged and missing values skipped. A row or a
    /// column only exists once a value has been observed for it. Columns are
    /// sorted by name, rows by key.
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (K, String, Option<f64>)>,
    {
        let mut cells: BTreeMap<K, BTreeMap<String, Mean>> = BTreeMap::new();
        let mut columns = BTreeSet::new();

        for (key, column, value) in observations {
            let Some(value) = value else { continue };
            cells
                .entry(key)
                .or_default()
                .entry(column.clone())
                .or_default()
                .push(value);
            columns.insert(column);
        }

        let columns: Vec<String> = columns.into_iter().collect();
        let rows = cells
            .into_iter()
            .map(|(key, row)| PivotRow {
                key,
                values: columns
                    .iter()
                    .map(|c| row.get(c).and_then(Mean::value))
                    .collect(),
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[PivotRow<K>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.iter().map(|r| &r.key)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, key: &K) -> Option<&PivotRow<K>> {
        self.rows
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn get(&self, key: &K, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.row(key).and_then(|r| r.values[idx])
    }

    /// Replace every missing cell with `value`
    pub fn fill_missing(mut self, value: f64) -> Self {
        for row in &mut self.rows {
            for cell in &mut row.values {
                cell.get_or_insert(value);
            }
        }
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        for column in &mut self.columns {
            column.push_str(suffix);
        }
        self
    }

    /// Full outer merge on key. Columns of `self` come first; cells absent on
    /// either side are missing.
    pub fn outer_merge(self, other: PivotTable<K>) -> Self {
        let left_width = self.columns.len();
        let right_width = other.columns.len();
        let mut merged: BTreeMap<K, Vec<Option<f64>>> = BTreeMap::new();

        for row in self.rows {
            let mut values = row.values;
            values.resize(left_width + right_width, None);
            merged.insert(row.key, values);
        }
        for row in other.rows {
            let values = merged
                .entry(row.key)
                .or_insert_with(|| vec![None; left_width + right_width]);
            values[left_width..].copy_from_slice(&row.values);
        }

        let mut columns = self.columns;
        columns.extend(other.columns);
        Self {
            columns,
            rows: merged
                .into_iter()
                .map(|(key, values)| PivotRow { key, values })
                .collect(),
        }
    }

    /// Append one column looked up by key; unmatched rows get a missing cell
    pub fn left_join_column(mut self, column: &str, lookup: &BTreeMap<K, f64>) -> Self {
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.values.push(lookup.get(&row.key).copied());
        }
        self
    }
}

impl<K: TableKey> PivotTable<K> {
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header: Vec<String> = K::headers().into_iter().map(String::from).collect();
        header.extend(self.columns.iter().cloned());
        out.write_record(&header)?;
        for row in &self.rows {
            // Numbers go through the serializer so every export formats them alike
            out.serialize((row.key.fields(), &row.values))?;
        }
        out.flush()?;
        Ok(())
    }
}
