use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quarter label such as `"1Q"`.
///
/// Visitor quarters are derived from month numbers; spend-survey quarters are
/// taken verbatim from the file, so joins only match identical labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quarter(String);

impl Quarter {
    pub fn from_month(month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(format!("{}Q", (month - 1) / 3 + 1)))
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            None
        } else {
            Some(Self(label.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the monthly arrivals file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    pub year: i32,
    pub month: u32,
    pub country: String,
    pub visitor_count: f64,
}

impl VisitorRecord {
    /// First day of the record's month
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn quarter(&self) -> Option<Quarter> {
        Quarter::from_month(self.month)
    }
}

/// One row of the consumption survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub year: i32,
    pub country: String,
    pub quarter: Quarter,
    pub expense_item: String,
    pub detail: String,
    pub consumption_unit: Option<f64>,
    pub composition_ratio: Option<f64>,
}

impl SpendRecord {
    pub fn key(&self) -> SpendKey {
        SpendKey {
            year: self.year,
            country: self.country.clone(),
            quarter: self.quarter.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub year: i32,
    pub prefecture: String,
    pub visit_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorScoreRecord {
    pub year: i32,
    pub country: String,
    /// One entry per component column, in header order
    pub scores: Vec<Option<f64>>,
}

/// (year, country, quarter) join key shared by spend-derived tables
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpendKey {
    pub year: i32,
    pub country: String,
    pub quarter: Quarter,
}

/// (year, country) join key for annual tables
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CountryYear {
    pub year: i32,
    pub country: String,
}

impl From<&SpendKey> for CountryYear {
    fn from(key: &SpendKey) -> Self {
        Self {
            year: key.year,
            country: key.country.clone(),
        }
    }
}
