//! Time column detection.
//!
//! Columns are treated as time axis candidates purely by name. Candidates are
//! then coerced to date/time values, leaving any column that does not parse
//! untouched. When nothing in the table looks like a time axis a synthetic
//! daily timeline is appended instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{Column, ColumnData, Table};

/// Name given to the synthesized timeline column
pub const FALLBACK_COLUMN: &str = "Timeline";

const ENGLISH_KEYWORDS: &[&str] = &["date", "time", "timestamp", "day", "month", "year"];
const ITALIAN_KEYWORDS: &[&str] = &[
    "data",
    "date",
    "time",
    "timestamp",
    "giorno",
    "mese",
    "anno",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Keyword list used to recognise time-like column names
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    It,
}

impl Locale {
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Locale::En => ENGLISH_KEYWORDS,
            Locale::It => ITALIAN_KEYWORDS,
        }
    }
}

/// First day of the synthesized timeline
pub fn fallback_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Every column name containing one of the keywords, case-insensitively,
/// in table order.
pub fn temporal_candidates(names: &[String], keywords: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .cloned()
        .collect()
}

/// Daily sequence of `rows` timestamps starting at the fallback epoch
pub fn synthesize_timeline(rows: usize) -> Vec<Option<NaiveDateTime>> {
    let start = fallback_epoch();
    (0..rows)
        .map(|i| Some(start + chrono::Duration::days(i as i64)))
        .collect()
}

/// Parses one textual date or date/time value
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Converts a column to temporal values.
///
/// Temporal columns are returned as-is. A text column converts only when every
/// non-empty cell parses. Numeric columns are never reinterpreted as dates.
pub fn coerce_temporal(data: &ColumnData) -> Option<ColumnData> {
    match data {
        ColumnData::Temporal(_) => Some(data.clone()),
        ColumnData::Numeric(_) => None,
        ColumnData::Text(values) => values
            .iter()
            .map(|v| match v {
                Some(s) if !s.trim().is_empty() => parse_datetime(s).map(Some),
                _ => Some(None),
            })
            .collect::<Option<Vec<_>>>()
            .map(ColumnData::Temporal),
    }
}

/// Outcome of running detection over a freshly loaded table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    pub candidates: Vec<String>,
    pub unparsed: Vec<String>,
    pub synthesized: bool,
}

/// Finds time axis candidates, synthesizes a timeline if there are none and
/// coerces every candidate in place.
pub fn detect_time_columns(table: &mut Table, keywords: &[&str]) -> Result<Detection> {
    let mut detection = Detection {
        candidates: temporal_candidates(&table.column_names(), keywords),
        ..Detection::default()
    };

    if detection.candidates.is_empty() && !table.is_empty() {
        let name = unique_name(table, FALLBACK_COLUMN);
        debug!(
            "no time column found, synthesizing {} with {} days",
            name,
            table.row_count()
        );
        table.push_column(Column::temporal(
            name.clone(),
            synthesize_timeline(table.row_count()),
        ))?;
        detection.candidates.push(name);
        detection.synthesized = true;
    }

    for name in &detection.candidates {
        let Some(column) = table.column_mut(name) else {
            continue;
        };
        match coerce_temporal(&column.data) {
            Some(data) => column.data = data,
            None => {
                warn!("column {} could not be parsed as dates", name);
                detection.unparsed.push(name.clone());
            }
        }
    }

    Ok(detection)
}

fn unique_name(table: &Table, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while table.column(&name).is_some() {
        name = format!("{}.{}", base, n);
        n += 1;
    }
    name
}
