//! Monitor configuration

use crate::drift::DriftThresholds;
use framewise_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the prediction monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Maximum number of prediction records kept in memory
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Drift policy thresholds
    #[serde(default)]
    pub drift: DriftThresholds,

    /// Window (hours) used by reports and accuracy by default
    #[serde(default = "default_report_window_hours")]
    pub report_window_hours: i64,

    /// Window (hours) used by the health check's drift evaluation
    #[serde(default = "default_health_window_hours")]
    pub health_window_hours: i64,
}

fn default_capacity() -> usize {
    10_000
}

fn default_report_window_hours() -> i64 {
    24
}

fn default_health_window_hours() -> i64 {
    6
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            drift: DriftThresholds::default(),
            report_window_hours: default_report_window_hours(),
            health_window_hours: default_health_window_hours(),
        }
    }
}

impl MonitorConfig {
    /// Config with a specific ring capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse monitor config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read monitor config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::config("monitor capacity must be at least 1"));
        }
        self.drift.validate()
    }
}
