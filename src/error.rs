use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, configuring or drawing the dashboard
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("{path} contains no sheets")]
    NoSheets { path: PathBuf },

    #[error("{path} is empty")]
    EmptySheet { path: PathBuf },

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("file has no extension: {0}")]
    MissingExtension(PathBuf),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("column {name} has {found} values, expected {expected}")]
    ColumnLength {
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("chart rendering failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
