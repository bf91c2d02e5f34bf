//! Load-once access to the dashboard's source table.
//!
//! The table is read at most once per [`DataCache`]; every later call returns
//! the same outcome, including a failed one. There is no invalidation: a
//! changed file is only picked up by a new process.

use lazy_static::lazy_static;
use log::error;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::DEFAULT_DATA_FILE;
use crate::detect::Locale;
use crate::loader::{LoadedData, load_data};

/// Result of the one load attempt
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Loaded(LoadedData),
    Failed { path: PathBuf, message: String },
}

impl LoadOutcome {
    pub fn data(&self) -> Option<&LoadedData> {
        match self {
            LoadOutcome::Loaded(data) => Some(data),
            LoadOutcome::Failed { .. } => None,
        }
    }

    /// Candidate time columns, empty when nothing was loaded
    pub fn temporal_candidates(&self) -> &[String] {
        self.data()
            .map(|d| d.temporal_candidates.as_slice())
            .unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadOutcome::Failed { message, .. } => Some(message),
            LoadOutcome::Loaded(_) => None,
        }
    }
}

pub struct DataCache {
    path: PathBuf,
    locale: Locale,
    cell: OnceLock<LoadOutcome>,
}

impl DataCache {
    pub fn new(path: impl Into<PathBuf>, locale: Locale) -> Self {
        DataCache {
            path: path.into(),
            locale,
            cell: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads on first use, then keeps returning the same outcome
    pub fn get(&self) -> &LoadOutcome {
        self.cell.get_or_init(|| {
            match load_data(&self.path, self.locale.keywords()) {
                Ok(data) => LoadOutcome::Loaded(data),
                Err(e) => {
                    error!("failed to load {}: {}", self.path.display(), e);
                    LoadOutcome::Failed {
                        path: self.path.clone(),
                        message: format!("Error loading file: {}", e),
                    }
                }
            }
        })
    }

    pub fn is_populated(&self) -> bool {
        self.cell.get().is_some()
    }
}

lazy_static! {
    static ref SHARED: DataCache = DataCache::new(DEFAULT_DATA_FILE, Locale::default());
}

/// Process-wide cache for the default input file
pub fn shared() -> &'static DataCache {
    &SHARED
}
