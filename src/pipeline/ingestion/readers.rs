use super::{
    open_optional, open_required, optional_number, read_rows, required_int, required_number,
    required_text, required_year, Columns, Parsed,
};
use crate::constants::*;
use crate::error::Result;
use crate::types::{BehaviorScoreRecord, DestinationRecord, Quarter, SpendRecord, VisitorRecord};
use std::path::Path;
use tracing::instrument;

pub const VISITORS: &str = "visitors";
pub const SPENDING: &str = "spending";
pub const DESTINATION: &str = "destination";
pub const BEHAVIOR_SCORES: &str = "behavior_scores";

/// Monthly arrivals by country. Mandatory.
#[instrument]
pub fn read_visitors(path: &Path) -> Result<Parsed<VisitorRecord>> {
    let mut reader = open_required(VISITORS, path)?;
    let columns = Columns::from_headers(
        VISITORS,
        reader.headers()?,
        &[VISITOR_YEAR, VISITOR_MONTH, VISITOR_COUNTRY, VISITOR_COUNT],
    )?;

    Ok(read_rows(VISITORS, &mut reader, &columns, |c, record| {
        let month = required_int(c.get(record, VISITOR_MONTH), VISITOR_MONTH)?;
        if !(1..=12).contains(&month) {
            return Err(format!("{VISITOR_MONTH} out of range: {month}"));
        }
        Ok(VisitorRecord {
            year: required_year(c.get(record, VISITOR_YEAR), VISITOR_YEAR)?,
            month: month as u32,
            country: required_text(c.get(record, VISITOR_COUNTRY), VISITOR_COUNTRY)?,
            visitor_count: required_number(c.get(record, VISITOR_COUNT), VISITOR_COUNT)?,
        })
    }))
}

/// Per-visitor consumption survey. Mandatory.
#[instrument]
pub fn read_spending(path: &Path) -> Result<Parsed<SpendRecord>> {
    let mut reader = open_required(SPENDING, path)?;
    let columns = Columns::from_headers(
        SPENDING,
        reader.headers()?,
        &[
            SPEND_YEAR,
            SPEND_COUNTRY,
            SPEND_QUARTER,
            SPEND_EXPENSE_ITEM,
            SPEND_DETAIL,
            SPEND_CONSUMPTION_UNIT,
            SPEND_COMPOSITION_RATIO,
        ],
    )?;

    Ok(read_rows(SPENDING, &mut reader, &columns, |c, record| {
        let quarter = Quarter::from_label(c.get(record, SPEND_QUARTER))
            .ok_or_else(|| format!("empty {SPEND_QUARTER}"))?;
        Ok(SpendRecord {
            year: required_year(c.get(record, SPEND_YEAR), SPEND_YEAR)?,
            country: required_text(c.get(record, SPEND_COUNTRY), SPEND_COUNTRY)?,
            quarter,
            expense_item: required_text(c.get(record, SPEND_EXPENSE_ITEM), SPEND_EXPENSE_ITEM)?,
            detail: c.get(record, SPEND_DETAIL).to_string(),
            consumption_unit: optional_number(
                c.get(record, SPEND_CONSUMPTION_UNIT),
                SPEND_CONSUMPTION_UNIT,
            )?,
            composition_ratio: optional_number(
                c.get(record, SPEND_COMPOSITION_RATIO),
                SPEND_COMPOSITION_RATIO,
            )?,
        })
    }))
}

/// Prefecture visit rates. `None` when the file is absent.
#[instrument]
pub fn read_destination(path: &Path) -> Result<Option<Parsed<DestinationRecord>>> {
    let Some(mut reader) = open_optional(DESTINATION, path)? else {
        return Ok(None);
    };
    let columns = Columns::from_headers(
        DESTINATION,
        reader.headers()?,
        &[DESTINATION_YEAR, DESTINATION_PREFECTURE, DESTINATION_VISIT_RATE],
    )?;

    Ok(Some(read_rows(DESTINATION, &mut reader, &columns, |c, record| {
        Ok(DestinationRecord {
            year: required_year(c.get(record, DESTINATION_YEAR), DESTINATION_YEAR)?,
            prefecture: required_text(
                c.get(record, DESTINATION_PREFECTURE),
                DESTINATION_PREFECTURE,
            )?,
            visit_rate: optional_number(
                c.get(record, DESTINATION_VISIT_RATE),
                DESTINATION_VISIT_RATE,
            )?,
        })
    })))
}

/// Principal-component scores per (year, country). Only `PC*` headers are
/// read as scores; any other column is ignored. `None` when the file is absent.
#[instrument]
pub fn read_behavior_scores(
    path: &Path,
) -> Result<Option<(Vec<String>, Parsed<BehaviorScoreRecord>)>> {
    let Some(mut reader) = open_optional(BEHAVIOR_SCORES, path)? else {
        return Ok(None);
    };
    let columns = Columns::from_headers(
        BEHAVIOR_SCORES,
        reader.headers()?,
        &[BEHAVIOR_YEAR, BEHAVIOR_COUNTRY],
    )?;

    let components: Vec<(usize, String)> = columns
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(BEHAVIOR_COMPONENT_PREFIX))
        .map(|(idx, name)| (idx, name.clone()))
        .collect();

    let parsed = read_rows(BEHAVIOR_SCORES, &mut reader, &columns, |c, record| {
        let scores = components
            .iter()
            .map(|(idx, name)| {
                optional_number(record.get(*idx).map(str::trim).unwrap_or(""), name)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(BehaviorScoreRecord {
            year: required_year(c.get(record, BEHAVIOR_YEAR), BEHAVIOR_YEAR)?,
            country: required_text(c.get(record, BEHAVIOR_COUNTRY), BEHAVIOR_COUNTRY)?,
            scores,
        })
    });

    let names = components.into_iter().map(|(_, name)| name).collect();
    Ok(Some((names, parsed)))
}
