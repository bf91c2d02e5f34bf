//! The dashboard pipeline.
//!
//! [`render`] is a pure function of the loaded data and the user's
//! selection: it resolves the selection, filters by date, normalizes if asked
//! and builds everything a front end displays. Nothing is cached between
//! calls.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;

use crate::cache::LoadOutcome;
use crate::detect::fallback_epoch;
use crate::filter::filter_by_date_range;
use crate::loader::LoadedData;
use crate::selection::{ChartType, Selection, numeric_columns};
use crate::stats::{ColumnSummary, CorrelationMatrix, correlation, describe};
use crate::table::Table;

/// Usage guidance shown when no data could be loaded
pub const INSTRUCTIONS: &str = "\
How to use:
  1. Put the spreadsheet next to the application (or pass --data <file>)
  2. The file must contain at least one column of numeric data
  3. A time column is detected automatically when present
  4. Use the filters to customize the view
  5. Up to 10 columns can be shown at the same time

Features:
  - Numeric column selection (max 10)
  - Date range filter
  - Chart types: lines, lines + markers, area, bars
  - Data normalization
  - Descriptive statistics
  - Correlation matrix
  - Raw data view
";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible message accompanying the dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// How a series' area is filled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Fill {
    #[serde(rename = "none")]
    None,
    /// Down to the zero baseline
    #[serde(rename = "tozeroy")]
    ToZero,
    /// Down to the previous series
    #[serde(rename = "tonexty")]
    ToPrevious,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SeriesStyle {
    Line {
        width: u32,
        marker_size: Option<u32>,
        fill: Fill,
    },
    Bar {
        opacity: f64,
    },
}

/// One column drawn against the shared time axis
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<Option<NaiveDateTime>>,
    pub y: Vec<Option<f64>>,
    pub style: SeriesStyle,
}

/// Library-independent description of the main chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub chart_type: ChartType,
    pub x_title: String,
    pub y_title: String,
    pub show_legend: bool,
    pub hover_mode: String,
    pub height: u32,
    pub series: Vec<Series>,
}

/// Row and column counts shown next to the chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub total_rows: usize,
    pub total_columns: usize,
    pub filtered_rows: usize,
    pub numeric_columns: usize,
    pub selected_columns: Vec<String>,
}

/// Everything a front end needs to draw one state of the dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    /// The selection after it was checked against the data
    pub selection: Selection,
    pub notices: Vec<Notice>,
    pub info: Option<DatasetInfo>,
    pub chart: Option<ChartSpec>,
    pub statistics: Vec<ColumnSummary>,
    pub correlation: Option<CorrelationMatrix>,
    pub raw_data: Option<Table>,
    pub instructions: Option<String>,
}

impl Dashboard {
    fn empty(selection: Selection) -> Self {
        Dashboard {
            selection,
            notices: Vec::new(),
            info: None,
            chart: None,
            statistics: Vec::new(),
            correlation: None,
            raw_data: None,
            instructions: None,
        }
    }
}

/// Min-max rescales values to [0, 1].
///
/// Constant and all-missing columns are returned unchanged, and missing values
/// stay missing.
pub fn normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present = values.iter().flatten();
    let Some(&first) = present.next() else {
        return values.to_vec();
    };
    let (min, max) = present.fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max == min {
        return values.to_vec();
    }
    values
        .iter()
        .map(|v| v.map(|v| (v - min) / (max - min)))
        .collect()
}

/// Builds the main chart from an already filtered table
pub fn build_chart(
    table: &Table,
    time_column: &str,
    columns: &[String],
    chart_type: ChartType,
    normalize_values: bool,
    show_legend: bool,
) -> ChartSpec {
    let x: Vec<Option<NaiveDateTime>> = table
        .column(time_column)
        .and_then(|c| c.as_temporal())
        .map(<[_]>::to_vec)
        .unwrap_or_else(|| vec![None; table.row_count()]);

    let series = columns
        .iter()
        .filter_map(|name| table.column(name)?.as_numeric().map(|v| (name, v)))
        .enumerate()
        .map(|(i, (name, values))| {
            let y = if normalize_values {
                normalize(values)
            } else {
                values.to_vec()
            };
            let style = match chart_type {
                ChartType::Lines => SeriesStyle::Line {
                    width: 2,
                    marker_size: None,
                    fill: Fill::None,
                },
                ChartType::LinesMarkers => SeriesStyle::Line {
                    width: 2,
                    marker_size: Some(4),
                    fill: Fill::None,
                },
                ChartType::Area => SeriesStyle::Line {
                    width: 2,
                    marker_size: None,
                    fill: if i == 0 { Fill::ToZero } else { Fill::ToPrevious },
                },
                ChartType::Bars => SeriesStyle::Bar { opacity: 0.7 },
            };
            Series {
                name: name.clone(),
                x: x.clone(),
                y,
                style,
            }
        })
        .collect();

    ChartSpec {
        title: format!("Timeseries chart - {}", chart_type.label()),
        chart_type,
        x_title: "Date/Time".to_string(),
        y_title: if normalize_values {
            "Values (normalized)".to_string()
        } else {
            "Values".to_string()
        },
        show_legend,
        hover_mode: "x unified".to_string(),
        height: 600,
        series,
    }
}

/// Renders the dashboard for whatever the load produced
pub fn render(outcome: &LoadOutcome, selection: &Selection) -> Dashboard {
    match outcome {
        LoadOutcome::Loaded(data) => render_data(data, selection),
        LoadOutcome::Failed { path, message } => {
            let mut dashboard = Dashboard::empty(selection.clone());
            dashboard.notices.push(Notice::error(message.clone()));
            dashboard.notices.push(Notice::error(format!(
                "Unable to load the file. Make sure '{}' is present in the application directory.",
                path.display()
            )));
            dashboard.instructions = Some(INSTRUCTIONS.to_string());
            dashboard
        }
    }
}

/// Renders the dashboard for loaded data
pub fn render_data(data: &LoadedData, selection: &Selection) -> Dashboard {
    let table = &data.table;
    let (selection, resolve_notices) = selection.resolve(data);
    let mut dashboard = Dashboard::empty(selection.clone());
    let notices = &mut dashboard.notices;

    notices.push(Notice::success(format!(
        "File loaded successfully! Size: {} rows x {} columns",
        table.row_count(),
        table.column_count()
    )));
    if data.synthesized_timeline {
        notices.push(Notice::info(format!(
            "No time column found, using a daily timeline starting {}",
            fallback_epoch().date()
        )));
    }
    notices.extend(resolve_notices);

    let time_column = selection.time_column.as_deref();
    if time_column.is_none() {
        notices.push(Notice::warning("No time column found"));
    }

    let numeric = numeric_columns(table, time_column);
    if numeric.is_empty() {
        notices.push(Notice::warning("No numeric columns found"));
    }

    let filtered: Cow<'_, Table> = match time_column {
        Some(t) if !table.is_empty() => filter_by_date_range(table, t, &selection.date_range),
        _ => Cow::Borrowed(table),
    };

    dashboard.info = Some(DatasetInfo {
        total_rows: table.row_count(),
        total_columns: table.column_count(),
        filtered_rows: filtered.row_count(),
        numeric_columns: numeric.len(),
        selected_columns: selection.columns.clone(),
    });

    match time_column {
        Some(t) if !selection.columns.is_empty() => {
            let temporal = filtered.column(t).is_some_and(|c| c.is_temporal());
            if temporal {
                dashboard.chart = Some(build_chart(
                    &filtered,
                    t,
                    &selection.columns,
                    selection.chart_type,
                    selection.normalize,
                    selection.show_legend,
                ));
                dashboard.statistics = describe(&filtered, &selection.columns);
                if selection.columns.len() > 1 {
                    dashboard.correlation = Some(correlation(&filtered, &selection.columns));
                }
            } else {
                dashboard.notices.push(Notice::warning(format!(
                    "Column '{}' could not be parsed as dates, choose another time column",
                    t
                )));
            }
        }
        _ => dashboard.notices.push(Notice::warning(
            "Select at least one numeric column and a time column to display the chart",
        )),
    }

    if selection.show_raw_data {
        dashboard.raw_data = Some(match time_column {
            Some(t) if !selection.columns.is_empty() => {
                let mut names = vec![t.to_string()];
                names.extend(selection.columns.iter().cloned());
                filtered.select(&names)
            }
            _ => filtered.into_owned(),
        });
    }

    dashboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn scenario() -> LoadedData {
        LoadedData {
            source: PathBuf::from("scenario.xlsx"),
            table: Table::new(vec![
                Column::temporal(
                    "Timestamp",
                    (1..=10).map(|d| day(d).and_hms_opt(0, 0, 0)).collect(),
                ),
                Column::numeric("Revenue", (1..=10).map(|v| Some(v as f64 * 10.0)).collect()),
                Column::numeric("Cost", vec![Some(5.0); 10]),
            ])
            .unwrap(),
            temporal_candidates: vec!["Timestamp".into()],
            unparsed_candidates: Vec::new(),
            synthesized_timeline: false,
        }
    }

    fn has_warning(dashboard: &Dashboard, fragment: &str) -> bool {
        dashboard
            .notices
            .iter()
            .any(|n| n.level == Level::Warning && n.message.contains(fragment))
    }

    #[test]
    fn normalize_maps_extremes() {
        let out = normalize(&[Some(10.0), None, Some(30.0), Some(20.0)]);
        assert_eq!(out, vec![Some(0.0), None, Some(1.0), Some(0.5)]);
        assert_eq!(normalize(&[Some(5.0), Some(5.0)]), vec![Some(5.0), Some(5.0)]);
        assert_eq!(normalize(&[None, None]), vec![None, None]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn chart_styles_per_type() {
        let data = scenario();
        let cols = vec!["Revenue".to_string(), "Cost".to_string()];

        let area = build_chart(&data.table, "Timestamp", &cols, ChartType::Area, false, true);
        assert_eq!(area.title, "Timeseries chart - Area");
        assert!(matches!(area.series[0].style, SeriesStyle::Line { fill: Fill::ToZero, .. }));
        assert!(matches!(
            area.series[1].style,
            SeriesStyle::Line { fill: Fill::ToPrevious, .. }
        ));

        let bars = build_chart(&data.table, "Timestamp", &cols, ChartType::Bars, false, false);
        assert!(bars.series.iter().all(|s| s.style == SeriesStyle::Bar { opacity: 0.7 }));
        assert!(!bars.show_legend);

        let markers =
            build_chart(&data.table, "Timestamp", &cols, ChartType::LinesMarkers, true, true);
        assert_eq!(markers.y_title, "Values (normalized)");
        assert!(matches!(
            markers.series[0].style,
            SeriesStyle::Line { marker_size: Some(4), width: 2, .. }
        ));
        assert_eq!(markers.series[0].x.len(), 10);
    }

    #[test]
    fn default_render_has_everything() {
        let data = scenario();
        let dashboard = render_data(&data, &Selection::default_for(&data));
        let info = dashboard.info.as_ref().unwrap();
        assert_eq!(info.total_rows, 10);
        assert_eq!(info.filtered_rows, 10);
        assert_eq!(info.numeric_columns, 2);
        assert_eq!(dashboard.chart.as_ref().unwrap().series.len(), 2);
        assert_eq!(dashboard.statistics.len(), 2);
        assert!(dashboard.correlation.is_some());
        assert!(dashboard.raw_data.is_none());
        assert_eq!(dashboard.notices[0].level, Level::Success);
    }

    #[test]
    fn single_column_has_no_correlation() {
        let data = scenario();
        let selection = Selection {
            columns: vec!["Revenue".into()],
            ..Selection::default()
        };
        let dashboard = render_data(&data, &selection);
        assert_eq!(dashboard.statistics.len(), 1);
        assert!(dashboard.correlation.is_none());
    }

    #[test]
    fn no_selection_warns_instead_of_charting() {
        let data = scenario();
        let selection = Selection {
            show_raw_data: true,
            ..Selection::default()
        };
        let dashboard = render_data(&data, &selection);
        assert!(dashboard.chart.is_none());
        assert!(has_warning(&dashboard, "Select at least one numeric column"));
        // Without chart columns the raw view shows the whole filtered table
        assert_eq!(dashboard.raw_data.unwrap().column_count(), 3);
    }

    #[test]
    fn raw_data_is_filtered_and_narrowed() {
        let data = scenario();
        let selection = Selection {
            columns: vec!["Cost".into()],
            date_range: vec![day(2), day(4)],
            normalize: true,
            show_raw_data: true,
            ..Selection::default()
        };
        let raw = render_data(&data, &selection).raw_data.unwrap();
        assert_eq!(raw.column_names(), vec!["Timestamp", "Cost"]);
        assert_eq!(raw.row_count(), 3);
    }

    #[test]
    fn normalization_uses_the_filtered_extremes() {
        let data = scenario();
        let selection = Selection {
            columns: vec!["Revenue".into()],
            date_range: vec![day(3), day(5)],
            normalize: true,
            ..Selection::default()
        };
        let chart = render_data(&data, &selection).chart.unwrap();
        // Revenue 30, 40, 50 in range; the full table spans 10..100
        assert_eq!(chart.series[0].y, vec![Some(0.0), Some(0.5), Some(1.0)]);
        assert_eq!(chart.series[0].x.first(), Some(&day(3).and_hms_opt(0, 0, 0)));
    }

    #[test]
    fn unparsed_time_column_disables_chart() {
        let mut data = scenario();
        data.table
            .push_column(Column::text("Day label", vec![Some("mon".into()); 10]))
            .unwrap();
        data.temporal_candidates.push("Day label".into());
        data.unparsed_candidates.push("Day label".into());

        let selection = Selection {
            time_column: Some("Day label".into()),
            columns: vec!["Revenue".into()],
            ..Selection::default()
        };
        let dashboard = render_data(&data, &selection);
        assert!(dashboard.chart.is_none());
        assert!(has_warning(&dashboard, "could not be parsed as dates"));
    }

    #[test]
    fn no_numeric_columns() {
        let data = LoadedData {
            source: PathBuf::from("labels.csv"),
            table: Table::new(vec![
                Column::temporal("Date", vec![day(1).and_hms_opt(0, 0, 0)]),
                Column::text("Label", vec![Some("a".into())]),
            ])
            .unwrap(),
            temporal_candidates: vec!["Date".into()],
            unparsed_candidates: Vec::new(),
            synthesized_timeline: false,
        };
        let dashboard = render_data(&data, &Selection::default_for(&data));
        assert!(has_warning(&dashboard, "No numeric columns found"));
        assert!(dashboard.chart.is_none());
    }

    #[test]
    fn failed_load_shows_instructions() {
        let outcome = LoadOutcome::Failed {
            path: PathBuf::from("Domande.xlsx"),
            message: "Error loading file: missing".into(),
        };
        let dashboard = render(&outcome, &Selection::default());
        assert!(dashboard.info.is_none());
        assert!(dashboard.chart.is_none());
        assert_eq!(dashboard.instructions.as_deref(), Some(INSTRUCTIONS));
        assert!(dashboard.notices.iter().all(|n| n.level == Level::Error));
    }
}
