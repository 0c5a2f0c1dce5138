//! Profiling run configuration.
//!
//! Settings can come from a JSON file; command-line flags override whatever
//! the file sets.

use crate::models::Architecture;
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Built-in architecture, used when no model file is given.
    pub architecture: Architecture,
    /// JSON model description, takes precedence over `architecture`.
    pub model_path: Option<PathBuf>,
    pub format: ReportFormat,
    /// Report destination; stdout when unset.
    pub output: Option<PathBuf>,
    /// Graphviz export of the layer graph.
    pub dot: Option<PathBuf>,
    /// Print plain numbers instead of K/M/G/B suffixes.
    pub raw_numbers: bool,
}

impl ProfileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}
