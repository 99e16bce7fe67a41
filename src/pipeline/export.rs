use super::Snapshot;
use crate::constants::TABLE_NAMES;
use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(PipelineError::Config(format!(
                "Unknown export format '{other}' (expected json or csv)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableName {
    VisitorPivot,
    RatioUnit,
    DestinationPivot,
    BehaviorScores,
    AnnualVisitors,
    YearlyAvgSpend,
    MarketPotentialQuarterly,
    MarketPotentialYearly,
    SpendItems,
}

impl TableName {
    pub const ALL: [TableName; 9] = [
        Self::VisitorPivot,
        Self::RatioUnit,
        Self::DestinationPivot,
        Self::BehaviorScores,
        Self::AnnualVisitors,
        Self::YearlyAvgSpend,
        Self::MarketPotentialQuarterly,
        Self::MarketPotentialYearly,
        Self::SpendItems,
    ];

    pub fn as_str(&self) -> &'static str {
        // ALL and TABLE_NAMES share an order
        TABLE_NAMES[*self as usize]
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "Unknown table '{s}' (expected one of: {})",
                    TABLE_NAMES.join(", ")
                ))
            })
    }
}

impl Snapshot {
    /// Number of rows in one output table
    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::VisitorPivot => self.visitor_pivot.len(),
            TableName::RatioUnit => self.ratio_unit.len(),
            TableName::DestinationPivot => self.destination_pivot.len(),
            TableName::BehaviorScores => self.behavior_scores.len(),
            TableName::AnnualVisitors => self.annual_visitors.len(),
            TableName::YearlyAvgSpend => self.yearly_avg_spend.len(),
            TableName::MarketPotentialQuarterly => self.market_potential_quarterly.len(),
            TableName::MarketPotentialYearly => self.market_potential_yearly.len(),
            TableName::SpendItems => self.spend_items.len(),
        }
    }

    pub fn write_table<W: Write>(
        &self,
        table: TableName,
        format: ExportFormat,
        writer: W,
    ) -> Result<()> {
        match format {
            ExportFormat::Json => self.write_json(table, writer),
            ExportFormat::Csv => self.write_csv(table, writer),
        }
    }

    fn write_json<W: Write>(&self, table: TableName, writer: W) -> Result<()> {
        match table {
            TableName::VisitorPivot => to_json(writer, &self.visitor_pivot),
            TableName::RatioUnit => to_json(writer, &self.ratio_unit),
            TableName::DestinationPivot => to_json(writer, &self.destination_pivot),
            TableName::BehaviorScores => to_json(writer, &self.behavior_scores),
            TableName::AnnualVisitors => to_json(writer, &self.annual_visitors),
            TableName::YearlyAvgSpend => to_json(writer, &self.yearly_avg_spend),
            TableName::MarketPotentialQuarterly => {
                to_json(writer, &self.market_potential_quarterly)
            }
            TableName::MarketPotentialYearly => to_json(writer, &self.market_potential_yearly),
            TableName::SpendItems => to_json(writer, &self.spend_items),
        }
    }

    fn write_csv<W: Write>(&self, table: TableName, writer: W) -> Result<()> {
        match table {
            TableName::VisitorPivot => self.visitor_pivot.write_csv(writer),
            TableName::RatioUnit => self.ratio_unit.write_csv(writer),
            TableName::DestinationPivot => self.destination_pivot.write_csv(writer),
            TableName::BehaviorScores => self.behavior_scores.write_csv(writer),
            TableName::AnnualVisitors => serialize_rows(writer, &self.annual_visitors),
            TableName::YearlyAvgSpend => serialize_rows(writer, &self.yearly_avg_spend),
            TableName::MarketPotentialQuarterly => {
                self.market_potential_quarterly.write_csv(writer)
            }
            TableName::MarketPotentialYearly => self.market_potential_yearly.write_csv(writer),
            TableName::SpendItems => {
                let mut out = csv::Writer::from_writer(writer);
                out.write_record(["item_name"])?;
                for item in &self.spend_items {
                    out.write_record([item])?;
                }
                out.flush()?;
                Ok(())
            }
        }
    }
}

fn to_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn serialize_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}
