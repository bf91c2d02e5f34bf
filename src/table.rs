use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{DashboardError, Result};

/// A single raw cell as read from the source file, before the column is typed
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl CellValue {
    fn render(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Typed storage for one column. Missing cells are `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Temporal(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Temporal(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Temporal(v) => {
                ColumnData::Temporal(rows.iter().map(|&r| v[r]).collect())
            }
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    pub fn temporal(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Self::new(name, ColumnData::Temporal(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    /// Types a column from raw cells.
    ///
    /// All non-empty cells numeric gives a numeric column (this includes a
    /// column with no values at all), all date/times gives a temporal column,
    /// anything else falls back to text.
    pub fn from_cells(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        let filled = || cells.iter().filter(|c| !matches!(c, CellValue::Empty));

        if filled().all(|c| matches!(c, CellValue::Number(_))) {
            let values = cells
                .iter()
                .map(|c| match c {
                    CellValue::Number(n) => Some(*n),
                    _ => None,
                })
                .collect();
            return Self::numeric(name, values);
        }

        if filled().all(|c| matches!(c, CellValue::DateTime(_))) {
            let values = cells
                .iter()
                .map(|c| match c {
                    CellValue::DateTime(dt) => Some(*dt),
                    _ => None,
                })
                .collect();
            return Self::temporal(name, values);
        }

        Self::text(name, cells.iter().map(CellValue::render).collect())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self.data, ColumnData::Temporal(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_temporal(&self) -> Option<&[Option<NaiveDateTime>]> {
        match &self.data {
            ColumnData::Temporal(v) => Some(v),
            _ => None,
        }
    }

    /// Cell text used by the raw-data view
    pub fn display(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map(format_number).unwrap_or_default(),
            ColumnData::Temporal(v) => v[row]
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }
}

/// An in-memory table of equally sized named columns
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        for column in &columns {
            if column.len() != rows {
                return Err(DashboardError::ColumnLength {
                    name: column.name.clone(),
                    found: column.len(),
                    expected: rows,
                });
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.rows {
            let found = column.len();
            return Err(DashboardError::ColumnLength {
                name: column.name,
                found,
                expected: self.rows,
            });
        }
        self.rows = column.len();
        self.columns.push(column);
        Ok(())
    }

    /// New table holding only the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
            rows: rows.len(),
        }
    }

    /// New table with the named columns, in the given order. Unknown names
    /// are skipped.
    pub fn select(&self, names: &[String]) -> Table {
        Table {
            columns: names
                .iter()
                .filter_map(|n| self.column(n).cloned())
                .collect(),
            rows: self.rows,
        }
    }
}

/// Makes header names unique, naming blanks after their position
pub fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.trim().to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
