//! Feedback configuration

use framewise_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Override store and retraining settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Unprocessed overrides needed before retraining becomes eligible
    #[serde(default = "default_retrain_threshold")]
    pub retrain_threshold: usize,

    /// Maximum overrides held in memory
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Fail a job whose training runs longer than this many milliseconds
    #[serde(default)]
    pub training_timeout_ms: Option<u64>,
}

fn default_retrain_threshold() -> usize {
    10
}

fn default_capacity() -> usize {
    10_000
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            retrain_threshold: default_retrain_threshold(),
            capacity: default_capacity(),
            training_timeout_ms: None,
        }
    }
}

impl FeedbackConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse feedback config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read feedback config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrain_threshold == 0 {
            return Err(Error::config("retrain_threshold must be at least 1"));
        }
        if self.capacity < self.retrain_threshold {
            return Err(Error::config(format!(
                "override capacity ({}) must not be below retrain_threshold ({})",
                self.capacity, self.retrain_threshold
            )));
        }
        Ok(())
    }

    pub fn training_timeout(&self) -> Option<Duration> {
        self.training_timeout_ms.map(Duration::from_millis)
    }
}
