/*!
# Timeseries Dashboard

An interactive dashboard for exploring time series stored in a spreadsheet,
built in Rust.

## Overview

The application loads one spreadsheet (CSV or any workbook format calamine
reads), finds the columns that hold dates, and lets the user pick numeric
columns to plot against time. Every change of selection recomputes the whole
view: date filtering, optional normalization, the chart, descriptive
statistics, the correlation matrix and the raw data table.

## Architecture

### Data Layer
- **Loader** - Reads the first sheet, header row first, into typed columns
- **Time detection** - Finds time-like columns by name and converts them to
  timestamps, or synthesizes a daily timeline when there is none
- **Cache** - Loads the file once per process and keeps the outcome

### Pipeline
- **Selection** - Checks the user's choices against the loaded data
- **Filter** - Restricts rows to an inclusive date range
- **Statistics** - Summary table and Pearson correlation
- **Render** - The pure `render(outcome, selection)` producing a [`Dashboard`]

### Front Ends
- **CLI** (`dashboard` binary) - Prints one dashboard, as text or JSON
- **Web** (`website` binary, `web` feature) - axum server with a browser page
  and PNG charts drawn with plotters

## Modules

- **table**: Column-oriented table and cell values
- **detect**: Time column keywords, date parsing and the fallback timeline
- **loader**: CSV and workbook loading
- **cache**: Load-once data cache
- **config**: JSON configuration with defaults
- **error**: Library error type
- **selection**: User selection and its resolution
- **filter**: Date range filtering
- **stats**: Descriptive statistics and correlation
- **render**: Dashboard pipeline and chart description
- **graph**: PNG rendering of charts (web feature)
- **app**: Routing and handlers (web feature)

## REST API Endpoints

- `GET /` - Dashboard page
- `GET /api/dataset` - Load status, columns, candidates and default selection
- `POST /api/render` - Dashboard for a JSON selection
- `POST /api/chart.png` - Main chart as PNG
- `POST /api/correlation.png` - Correlation heat map as PNG
*/

pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod loader;
pub mod render;
pub mod selection;
pub mod stats;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

/// Re-export the types most callers need
pub use cache::{DataCache, LoadOutcome};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use loader::{LoadedData, load_data};
pub use render::{Dashboard, render};
pub use selection::{ChartType, Selection};
pub use table::{Column, ColumnData, Table};
