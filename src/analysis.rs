//! Selection and comparison helpers shared by dashboard views.
//!
//! Nothing here renders anything; these are the small orderings and deltas
//! the views derive from snapshot tables.

pub mod quadrant;

use crate::config::PresentationConfig;

/// "All countries" first, then the rest by name, "other" last
pub fn sort_countries<S: AsRef<str>>(
    countries: &[S],
    presentation: &PresentationConfig,
) -> Vec<String> {
    let mut middle: Vec<String> = countries
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| *c != presentation.all_countries_label && *c != presentation.other_label)
        .map(str::to_string)
        .collect();
    middle.sort();
    middle.dedup();

    let has = |label: &str| countries.iter().any(|c| c.as_ref() == label);
    let mut sorted = Vec::with_capacity(middle.len() + 2);
    if has(&presentation.all_countries_label) {
        sorted.push(presentation.all_countries_label.clone());
    }
    sorted.extend(middle);
    if has(&presentation.other_label) {
        sorted.push(presentation.other_label.clone());
    }
    sorted
}

/// Initial country selection: priority countries that exist in the data,
/// plus "other" while fewer than nine are chosen, capped at `max`.
pub fn default_countries<S: AsRef<str>>(
    available: &[S],
    max: usize,
    presentation: &PresentationConfig,
) -> Vec<String> {
    let has = |label: &str| available.iter().any(|c| c.as_ref() == label);

    let mut chosen: Vec<String> = presentation
        .priority_countries
        .iter()
        .filter(|c| has(c))
        .cloned()
        .collect();

    if has(&presentation.other_label)
        && !chosen.contains(&presentation.other_label)
        && chosen.len() < 9
    {
        chosen.push(presentation.other_label.clone());
    }
    chosen.truncate(max);
    chosen
}

/// Change between a target value and a comparison value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub diff: f64,
    /// Percentage change; `None` when the comparison is zero and the values differ
    pub rate: Option<f64>,
}

impl Delta {
    /// `None` when there is nothing to compare against
    pub fn between(target: f64, comparison: Option<f64>) -> Option<Self> {
        let comparison = comparison.filter(|c| !c.is_nan())?;
        let diff = target - comparison;
        let rate = if comparison == 0.0 {
            (diff == 0.0).then_some(0.0)
        } else {
            Some(diff / comparison * 100.0)
        };
        Some(Self { diff, rate })
    }
}

const NO_DATA: &str = "データなし";

pub fn format_delta_percent(rate: Option<f64>) -> String {
    match rate {
        Some(r) if !r.is_nan() => format!("{r:+.1} %"),
        _ => NO_DATA.to_string(),
    }
}

/// Signed head count with thousands separators, e.g. `+1,234 人`
pub fn format_delta_abs(delta: Option<&Delta>) -> String {
    match delta {
        Some(d) if !d.diff.is_nan() => format!("{} 人", signed_thousands(d.diff)),
        _ => NO_DATA.to_string(),
    }
}

fn signed_thousands(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { '-' } else { '+' };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

/// Human-readable description of a principal component, or its raw name
pub fn pc_label<'a>(presentation: &'a PresentationConfig, component: &'a str) -> &'a str {
    presentation
        .pc_labels
        .get(component)
        .map(String::as_str)
        .unwrap_or(component)
}
