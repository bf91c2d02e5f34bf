#![cfg(not(tarpaulin_include))]

use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};
use tsdash::cache::{self, DataCache};
use tsdash::config::{DEFAULT_DATA_FILE, DashboardConfig};
use tsdash::detect::Locale;
use tsdash::render::{Dashboard, Level, render};
use tsdash::selection::{ChartType, Selection};
use tsdash::table::{Table, format_number};

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Explore a spreadsheet of time series from the terminal")]
struct Args {
    /// Spreadsheet to load
    #[arg(long)]
    data: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column to use as the time axis
    #[arg(long)]
    time_column: Option<String>,

    /// Comma separated numeric columns to chart
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// First day of the range, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the range, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,

    /// lines, lines-markers, area or bars
    #[arg(long, default_value = "lines")]
    chart: ChartType,

    #[arg(long)]
    normalize: bool,

    #[arg(long)]
    no_legend: bool,

    /// Include the filtered rows
    #[arg(long)]
    raw: bool,

    /// Print the whole dashboard as JSON
    #[arg(long)]
    json: bool,
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Success => "ok",
        Level::Info => "info",
        Level::Warning => "warning",
        Level::Error => "error",
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "-".to_string())
}

fn print_table(table: &Table) {
    let names = table.column_names();
    println!("{}", names.join("\t"));
    for row in 0..table.row_count() {
        let line: Vec<String> = table.columns().iter().map(|c| c.display(row)).collect();
        println!("{}", line.join("\t"));
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    for notice in &dashboard.notices {
        println!("[{}] {}", level_tag(notice.level), notice.message);
    }
    if let Some(instructions) = &dashboard.instructions {
        println!();
        print!("{}", instructions);
        return;
    }

    if let Some(info) = &dashboard.info {
        println!();
        println!(
            "Total rows: {}  Filtered rows: {}  Numeric columns: {}  Selected columns: {}",
            info.total_rows,
            info.filtered_rows,
            info.numeric_columns,
            info.selected_columns.len()
        );
    }

    if let Some(chart) = &dashboard.chart {
        println!();
        println!("{} ({} vs {})", chart.title, chart.y_title, chart.x_title);
        for series in &chart.series {
            let values: Vec<f64> = series.y.iter().flatten().copied().collect();
            let lo = values.iter().copied().reduce(f64::min);
            let hi = values.iter().copied().reduce(f64::max);
            println!(
                "  {}: {} points, range {} .. {}",
                series.name,
                values.len(),
                cell(lo),
                cell(hi)
            );
        }
    }

    if !dashboard.statistics.is_empty() {
        println!();
        println!("Descriptive statistics");
        println!("column\tcount\tmean\tstd\tmin\t25%\t50%\t75%\tmax");
        for s in &dashboard.statistics {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.column,
                s.count,
                cell(s.mean),
                cell(s.std),
                cell(s.min),
                cell(s.q25),
                cell(s.median),
                cell(s.q75),
                cell(s.max)
            );
        }
    }

    if let Some(matrix) = &dashboard.correlation {
        println!();
        println!("Correlation matrix");
        println!("\t{}", matrix.columns.join("\t"));
        for (name, row) in matrix.columns.iter().zip(&matrix.values) {
            let values: Vec<String> = row
                .iter()
                .map(|v| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string()))
                .collect();
            println!("{}\t{}", name, values.join("\t"));
        }
    }

    if let Some(raw) = &dashboard.raw_data {
        println!();
        println!("Raw data");
        print_table(raw);
    }
}

/// Command line front end: loads the spreadsheet once, applies the flags on
/// top of the default selection and prints one dashboard
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        config.data_path = data;
    }

    let owned;
    let cache: &DataCache =
        if config.data_path == Path::new(DEFAULT_DATA_FILE) && config.locale == Locale::default() {
            cache::shared()
        } else {
            owned = DataCache::new(config.data_path.clone(), config.locale);
            &owned
        };
    let outcome = cache.get();

    let mut selection = outcome
        .data()
        .map(Selection::default_for)
        .unwrap_or_default();
    if let Some(time_column) = args.time_column {
        selection.time_column = Some(time_column);
    }
    if let Some(columns) = args.columns {
        selection.columns = columns.into_iter().map(|c| c.trim().to_string()).collect();
    }
    if args.from.is_some() || args.to.is_some() {
        let (lo, hi) = match selection.date_range.as_slice() {
            &[lo, hi] => (Some(lo), Some(hi)),
            _ => (None, None),
        };
        selection.date_range = match (args.from.or(lo), args.to.or(hi)) {
            (Some(from), Some(to)) => vec![from, to],
            _ => Vec::new(),
        };
    }
    selection.chart_type = args.chart;
    selection.normalize = args.normalize;
    selection.show_legend = !args.no_legend;
    selection.show_raw_data = args.raw;

    let dashboard = render(outcome, &selection);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print_dashboard(&dashboard);
    }

    Ok(())
}
