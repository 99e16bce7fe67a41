// Pipeline ingestion: opening the raw CSV exports, header checks and row parsing

pub mod readers;

pub use readers::{read_behavior_scores, read_destination, read_spending, read_visitors};

use crate::error::{PipelineError, Result};
use crate::metrics::IngestMetrics;
use csv::StringRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Cell values read as missing, in addition to the empty string
const NA_VALUES: [&str; 6] = ["nan", "NaN", "NA", "N/A", "null", "NULL"];

/// A row that was dropped during ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub file: &'static str,
    /// 1-based line number in the source file, header included
    pub line: usize,
    pub message: String,
}

/// Records parsed from one file plus what was dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub issues: Vec<RowIssue>,
    pub rows_read: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
            rows_read: 0,
        }
    }
}

/// Header name → column position for one file
pub(crate) struct Columns {
    index: HashMap<String, usize>,
    headers: Vec<String>,
}

impl Columns {
    pub(crate) fn from_headers(
        file: &str,
        headers: &StringRecord,
        required: &[&str],
    ) -> Result<Self> {
        let headers: Vec<String> = headers.iter().map(normalize_header_name).collect();
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !index.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                file: file.to_string(),
                columns: missing,
            });
        }

        Ok(Self { index, headers })
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Trimmed cell value; absent cells read as empty
    pub(crate) fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.position(name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Open a mandatory input; absence is fatal and names the file
pub(crate) fn open_required(role: &'static str, path: &Path) -> Result<csv::Reader<File>> {
    match File::open(path) {
        Ok(file) => Ok(reader_for(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(PipelineError::MissingFile {
            role,
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Open an optional input; absence yields `None`
pub(crate) fn open_optional(role: &'static str, path: &Path) -> Result<Option<csv::Reader<File>>> {
    match File::open(path) {
        Ok(file) => Ok(Some(reader_for(file))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Optional {} file absent at {}", role, path.display());
            IngestMetrics::record_optional_absent(role);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn reader_for(file: File) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file)
}

/// Parse every data row, dropping the ones `parse` rejects.
pub(crate) fn read_rows<T, F>(
    file: &'static str,
    reader: &mut csv::Reader<File>,
    columns: &Columns,
    mut parse: F,
) -> Parsed<T>
where
    F: FnMut(&Columns, &StringRecord) -> std::result::Result<T, String>,
{
    let mut parsed = Parsed::default();

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line
        let line = idx + 2;
        parsed.rows_read += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse(columns, &record));
        match outcome {
            Ok(record) => parsed.records.push(record),
            Err(message) => {
                warn!(file, line, "Dropping row: {}", message);
                parsed.issues.push(RowIssue { file, line, message });
            }
        }
    }

    IngestMetrics::record_file(file, parsed.rows_read, parsed.issues.len());
    debug!(
        file,
        rows = parsed.rows_read,
        dropped = parsed.issues.len(),
        "Finished reading"
    );
    parsed
}

pub(crate) fn required_text(value: &str, column: &str) -> std::result::Result<String, String> {
    if value.is_empty() {
        Err(format!("empty {column}"))
    } else {
        Ok(value.to_string())
    }
}

/// Integer cell; tolerates a float rendering such as `2023.0`
pub(crate) fn required_int(value: &str, column: &str) -> std::result::Result<i64, String> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(format!("{column} is not an integer: {value:?}")),
    }
}

pub(crate) fn required_year(value: &str, column: &str) -> std::result::Result<i32, String> {
    let year = required_int(value, column)?;
    i32::try_from(year).map_err(|_| format!("{column} out of range: {value:?}"))
}

pub(crate) fn required_number(value: &str, column: &str) -> std::result::Result<f64, String> {
    optional_number(value, column)?.ok_or_else(|| format!("missing {column}"))
}

/// Numeric cell where blanks and NA markers mean "missing"
pub(crate) fn optional_number(
    value: &str,
    column: &str,
) -> std::result::Result<Option<f64>, String> {
    if value.is_empty() || NA_VALUES.contains(&value) {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(format!("{column} is not numeric: {value:?}")),
    }
}
