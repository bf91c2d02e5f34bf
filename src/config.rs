use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::detect::Locale;
use crate::error::{DashboardError, Result};

/// Spreadsheet read when no other path is configured
pub const DEFAULT_DATA_FILE: &str = "Domande.xlsx";

/// Runtime settings shared by the CLI and the web server
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Spreadsheet to load
    pub data_path: PathBuf,

    /// Keyword list used to find time columns
    pub locale: Locale,

    /// Address the web server listens on
    pub bind_address: String,

    /// Rendered chart width in pixels
    pub chart_width: u32,

    /// Correlation heat map height in pixels. The main chart takes its
    /// height from the chart itself.
    pub chart_height: u32,

    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            locale: Locale::En,
            bind_address: "127.0.0.1:3000".to_string(),
            chart_width: 1200,
            chart_height: 600,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl DashboardConfig {
    /// Reads a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DashboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DashboardError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the config file if one was given, otherwise uses the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(&path, r#"{ "data_path": "sales.csv", "locale": "it" }"#).unwrap();

        let config = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("sales.csv"));
        assert_eq!(config.locale, Locale::It);
        assert_eq!(config.chart_height, 600);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn bad_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(&path, "{ chart_width: }").unwrap();
        assert!(matches!(
            DashboardConfig::from_file(&path),
            Err(DashboardError::Config { .. })
        ));
        assert!(matches!(
            DashboardConfig::load(Some(&dir.path().join("nope.json"))),
            Err(DashboardError::Io { .. })
        ));
        assert_eq!(DashboardConfig::load(None).unwrap(), DashboardConfig::default());
    }
}
