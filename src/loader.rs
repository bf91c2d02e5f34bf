use calamine::{Data, Reader, open_workbook_auto};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::detect::{detect_time_columns, parse_datetime};
use crate::error::{DashboardError, Result};
use crate::table::{CellValue, Column, Table, dedupe_headers};

lazy_static! {
    static ref NUMBER_REGEX: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

/// A table loaded from disk together with its time column detection
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedData {
    pub source: PathBuf,
    pub table: Table,
    /// Columns usable as a time axis, in table order
    pub temporal_candidates: Vec<String>,
    /// Candidates whose values could not be converted to dates
    pub unparsed_candidates: Vec<String>,
    /// Whether `temporal_candidates` holds a synthesized timeline
    pub synthesized_timeline: bool,
}

/// Load a table from a CSV file
///
/// The first line is the header row. Cells that look like numbers become
/// numbers, blank cells are missing and everything else is kept as text.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<Table>` - The loaded table or an error
///
/// # Examples
/// ```no_run
/// use tsdash::loader::from_csv;
///
/// match from_csv("data.csv") {
///     Ok(table) => println!("Loaded {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let io_err = |source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader
        .lines()
        .collect::<std::result::Result<_, _>>()
        .map_err(io_err)?;

    let mut lines = lines.into_iter().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| DashboardError::EmptySheet {
        path: path.to_path_buf(),
    })?;

    let headers = dedupe_headers(parse_csv_row(&header));
    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];

    for line in lines {
        let mut fields = parse_csv_row(&line).into_iter();
        // Extra fields are dropped, short rows are padded with blanks
        for column in cells.iter_mut() {
            let value = fields.next().map(|f| csv_cell(&f)).unwrap_or(CellValue::Empty);
            column.push(value);
        }
    }

    Table::new(
        headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::from_cells(name, cells))
            .collect(),
    )
}

/// Load the first sheet of a workbook (xlsx, xlsm, xlsb, xls or ods)
///
/// The first row of the sheet is the header row. Date-formatted cells become
/// date/times, formulas contribute their cached values.
///
/// # Examples
/// ```no_run
/// use tsdash::loader::from_excel;
///
/// match from_excel("data.xlsx") {
///     Ok(table) => println!("Loaded Excel with {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading Excel: {}", e),
/// }
/// ```
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let workbook_err = |source| DashboardError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::NoSheets {
            path: path.to_path_buf(),
        })?
        .map_err(workbook_err)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };

    let headers = dedupe_headers(header.iter().map(|c| c.to_string()).collect());
    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];

    for row in rows {
        for (c, column) in cells.iter_mut().enumerate() {
            column.push(row.get(c).map(excel_cell).unwrap_or(CellValue::Empty));
        }
    }

    Table::new(
        headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::from_cells(name, cells))
            .collect(),
    )
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        // #N/A, #DIV/0! and friends read as missing
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn csv_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else if NUMBER_REGEX.is_match(trimmed) {
        trimmed
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or_else(|_| CellValue::Text(field.to_string()))
    } else {
        CellValue::Text(field.to_string())
    }
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Detect file type and load the appropriate format
///
/// # Arguments
/// * `filepath` - Path to the file to load
///
/// # Returns
/// * `Result<Table>` - The loaded table or an error
pub fn load_table(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => from_excel(path),
        Some(ext) => Err(DashboardError::UnsupportedExtension(ext.to_string())),
        None => Err(DashboardError::MissingExtension(path.to_path_buf())),
    }
}

/// Load a table and run time column detection on it
///
/// # Arguments
/// * `filepath` - Path to the spreadsheet
/// * `keywords` - Lowercase name fragments that mark a time column
pub fn load_data(filepath: impl AsRef<Path>, keywords: &[&str]) -> Result<LoadedData> {
    let path = filepath.as_ref();
    let mut table = load_table(path)?;
    info!(
        "loaded {} rows x {} columns from {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );

    let detection = detect_time_columns(&mut table, keywords)?;
    debug!("time column candidates: {:?}", detection.candidates);

    Ok(LoadedData {
        source: path.to_path_buf(),
        table,
        temporal_candidates: detection.candidates,
        unparsed_candidates: detection.unparsed,
        synthesized_timeline: detection.synthesized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Locale;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_quoted_fields() {
        assert_eq!(
            parse_csv_row(r#"a,"b,c","say ""hi""",,"#),
            vec!["a", "b,c", r#"say "hi""#, "", ""]
        );
    }

    #[test]
    fn classifies_csv_cells() {
        assert_eq!(csv_cell(" 12 "), CellValue::Number(12.0));
        assert_eq!(csv_cell("-1.5e3"), CellValue::Number(-1500.0));
        assert_eq!(csv_cell(".5"), CellValue::Number(0.5));
        assert_eq!(csv_cell(""), CellValue::Empty);
        assert_eq!(csv_cell("2024-01-01"), CellValue::Text("2024-01-01".into()));
        assert_eq!(csv_cell("1,5"), CellValue::Text("1,5".into()));
    }

    #[test]
    fn loads_csv_with_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "sales.csv",
            "Date,Revenue,Region\n2024-01-01,10,north\n2024-01-02,,south\n2024-01-03,12.5\n",
        );

        let data = load_data(&path, Locale::En.keywords()).unwrap();
        assert_eq!(data.temporal_candidates, vec!["Date"]);
        assert!(data.unparsed_candidates.is_empty());
        assert!(!data.synthesized_timeline);
        assert_eq!(data.table.row_count(), 3);
        assert!(data.table.column("Date").unwrap().is_temporal());
        assert_eq!(
            data.table.column("Revenue").unwrap().as_numeric(),
            Some(&[Some(10.0), None, Some(12.5)][..])
        );
        assert!(!data.table.column("Region").unwrap().is_numeric());
    }

    #[test]
    fn header_only_csv_is_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "empty.csv", "Revenue,Cost\n");
        let data = load_data(&path, Locale::En.keywords()).unwrap();
        assert_eq!(data.table.row_count(), 0);
        assert!(data.temporal_candidates.is_empty());
    }

    #[test]
    fn rejects_unknown_inputs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_table(dir.path().join("data.parquet")),
            Err(DashboardError::UnsupportedExtension(ext)) if ext == "parquet"
        ));
        assert!(matches!(
            load_table(dir.path().join("data")),
            Err(DashboardError::MissingExtension(_))
        ));
        assert!(matches!(
            load_table(dir.path().join("missing.csv")),
            Err(DashboardError::Io { .. })
        ));
        let blank = write_csv(&dir, "blank.csv", "\n\n");
        assert!(matches!(
            load_table(blank),
            Err(DashboardError::EmptySheet { .. })
        ));
    }
}
