use crate::error::Result;
use crate::types::BehaviorScoreRecord;
use serde::Serialize;
use std::io::Write;

/// Principal-component scores by (year, country). The source's
/// `Country/Area` column is exposed as `country`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BehaviorScoreTable {
    pub components: Vec<String>,
    pub rows: Vec<BehaviorScoreRecord>,
}

impl BehaviorScoreTable {
    pub fn new(components: Vec<String>, rows: Vec<BehaviorScoreRecord>) -> Self {
        Self { components, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Score series for one component across all rows that carry it
    pub fn component(&self, name: &str) -> Vec<(i32, &str, f64)> {
        let Some(idx) = self.components.iter().position(|c| c == name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|r| {
                r.scores
                    .get(idx)
                    .copied()
                    .flatten()
                    .map(|score| (r.year, r.country.as_str(), score))
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = vec!["year".to_string(), "country".to_string()];
        header.extend(self.components.iter().cloned());
        out.write_record(&header)?;
        for row in &self.rows {
            out.serialize((row.year, &row.country, &row.scores))?;
        }
        out.flush()?;
        Ok(())
    }
}
