use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::loader::LoadedData;
use crate::render::Notice;
use crate::table::Table;

/// Most numeric columns that can be charted at once
pub const MAX_SELECTED_COLUMNS: usize = 10;

/// Available chart styles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    /// One line per column
    #[default]
    Lines,

    /// Lines with a marker on every point
    LinesMarkers,

    /// Filled areas, each stacked on the previous series
    Area,

    /// Semi-transparent bars
    Bars,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [
        ChartType::Lines,
        ChartType::LinesMarkers,
        ChartType::Area,
        ChartType::Bars,
    ];

    /// Name accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ChartType::Lines => "lines",
            ChartType::LinesMarkers => "lines-markers",
            ChartType::Area => "area",
            ChartType::Bars => "bars",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Lines => "Lines",
            ChartType::LinesMarkers => "Lines + Markers",
            ChartType::Area => "Area",
            ChartType::Bars => "Bars",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        if let Some(found) = ChartType::ALL
            .into_iter()
            .find(|c| c.name() == key || c.label().to_lowercase().replace(' ', "-") == key)
        {
            return Ok(found);
        }
        match key.as_str() {
            "line" => Ok(ChartType::Lines),
            "markers" => Ok(ChartType::LinesMarkers),
            "bar" => Ok(ChartType::Bars),
            other => {
                let names: Vec<&str> = ChartType::ALL.iter().map(|c| c.name()).collect();
                Err(format!(
                    "unknown chart type '{}', expected one of: {}",
                    other,
                    names.join(", ")
                ))
            }
        }
    }
}

/// Everything the user can choose on the dashboard
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    /// Column used as the x axis
    pub time_column: Option<String>,

    /// Numeric columns to chart, at most [`MAX_SELECTED_COLUMNS`]
    pub columns: Vec<String>,

    /// Inclusive date bounds. Anything other than exactly two bounds leaves
    /// the table unfiltered.
    pub date_range: Vec<NaiveDate>,

    pub chart_type: ChartType,
    pub show_legend: bool,

    /// Rescale each column to [0, 1] over the filtered rows
    pub normalize: bool,

    pub show_raw_data: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            time_column: None,
            columns: Vec::new(),
            date_range: Vec::new(),
            chart_type: ChartType::Lines,
            show_legend: true,
            normalize: false,
            show_raw_data: false,
        }
    }
}

/// Columns whose values are all numeric, without the active time column
pub fn numeric_columns(table: &Table, time_column: Option<&str>) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.is_numeric() && Some(c.name.as_str()) != time_column)
        .map(|c| c.name.clone())
        .collect()
}

/// Earliest and latest date in a temporal column
pub fn date_bounds(table: &Table, time_column: &str) -> Option<(NaiveDate, NaiveDate)> {
    let values = table.column(time_column)?.as_temporal()?;
    let mut dates = values.iter().flatten().map(|dt| dt.date());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

impl Selection {
    /// The selection a fresh dashboard starts with: first time column, up to
    /// ten numeric columns and the full date range.
    pub fn default_for(data: &LoadedData) -> Selection {
        Selection::default_for_time_column(data, None)
    }

    /// Like [`Selection::default_for`], for a chosen time column. Columns and
    /// date range follow that column. A name that is not a candidate falls
    /// back to the first candidate.
    pub fn default_for_time_column(data: &LoadedData, time_column: Option<&str>) -> Selection {
        let time_column = time_column
            .filter(|t| data.temporal_candidates.iter().any(|c| c == t))
            .map(str::to_string)
            .or_else(|| data.temporal_candidates.first().cloned());
        let mut columns = numeric_columns(&data.table, time_column.as_deref());
        columns.truncate(MAX_SELECTED_COLUMNS);
        let date_range = time_column
            .as_deref()
            .and_then(|t| date_bounds(&data.table, t))
            .map(|(lo, hi)| vec![lo, hi])
            .unwrap_or_default();

        Selection {
            time_column,
            columns,
            date_range,
            ..Selection::default()
        }
    }

    /// Brings a user-supplied selection in line with the loaded data.
    ///
    /// The time column must be a candidate (otherwise the first candidate is
    /// used), chart columns must be numeric and distinct from the time column
    /// and are capped at [`MAX_SELECTED_COLUMNS`]. Date bounds are put in
    /// order and clamped to the data extent. A range lying wholly outside the
    /// time column's data, such as one picked for another time column, is
    /// reset to the full extent with a warning.
    pub fn resolve(&self, data: &LoadedData) -> (Selection, Vec<Notice>) {
        let mut notices = Vec::new();
        let candidates = &data.temporal_candidates;

        let time_column = match &self.time_column {
            Some(t) if candidates.contains(t) => Some(t.clone()),
            Some(t) => {
                let fallback = candidates.first().cloned();
                notices.push(Notice::warning(format!(
                    "Time column '{}' is not available{}",
                    t,
                    fallback
                        .as_ref()
                        .map(|f| format!(", using '{}'", f))
                        .unwrap_or_default()
                )));
                fallback
            }
            None => candidates.first().cloned(),
        };

        let allowed = numeric_columns(&data.table, time_column.as_deref());
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for name in &self.columns {
            if !allowed.contains(name) {
                notices.push(Notice::warning(format!(
                    "Column '{}' is not a numeric column and was ignored",
                    name
                )));
            } else if seen.insert(name.as_str()) {
                columns.push(name.clone());
            }
        }
        if columns.len() > MAX_SELECTED_COLUMNS {
            notices.push(Notice::warning(format!(
                "At most {} columns can be shown, keeping the first {}",
                MAX_SELECTED_COLUMNS, MAX_SELECTED_COLUMNS
            )));
            columns.truncate(MAX_SELECTED_COLUMNS);
        }

        let bounds = time_column
            .as_deref()
            .and_then(|t| date_bounds(&data.table, t));
        let date_range = match (self.date_range.as_slice(), bounds) {
            (&[a, b], Some((lo, hi))) => {
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                if end < lo || start > hi {
                    notices.push(Notice::warning(format!(
                        "Date range {} - {} is outside the data, showing {} - {}",
                        start, end, lo, hi
                    )));
                    vec![lo, hi]
                } else {
                    vec![start.clamp(lo, hi), end.clamp(lo, hi)]
                }
            }
            (&[a, b], None) => vec![a.min(b), a.max(b)],
            (other, _) => other.to_vec(),
        };

        let resolved = Selection {
            time_column,
            columns,
            date_range,
            ..self.clone()
        };
        (resolved, notices)
    }
}
