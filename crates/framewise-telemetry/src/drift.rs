//! Drift policy
//!
//! A window of predictions is judged on three signals: average confidence,
//! confidence spread, and how much a single label dominates. Evaluation is a
//! pure function over `(label, confidence)` pairs so the policy can be tested
//! without a monitor.

use framewise_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Thresholds for the drift policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftThresholds {
    /// Minimum records in the window before drift is evaluated
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Flag when average confidence falls below this
    #[serde(default = "default_min_avg_confidence")]
    pub min_avg_confidence: f64,

    /// Flag when the confidence standard deviation exceeds this
    #[serde(default = "default_max_confidence_std")]
    pub max_confidence_std: f64,

    /// Flag when one label's share of predictions exceeds this
    #[serde(default = "default_max_dominant_share")]
    pub max_dominant_share: f64,
}

fn default_min_samples() -> usize {
    10
}

fn default_min_avg_confidence() -> f64 {
    0.7
}

fn default_max_confidence_std() -> f64 {
    0.3
}

fn default_max_dominant_share() -> f64 {
    0.9
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            min_avg_confidence: default_min_avg_confidence(),
            max_confidence_std: default_max_confidence_std(),
            max_dominant_share: default_max_dominant_share(),
        }
    }
}

impl DriftThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_avg_confidence", self.min_avg_confidence),
            ("max_confidence_std", self.max_confidence_std),
            ("max_dominant_share", self.max_dominant_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("drift.{name} must be within [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

/// A raised drift signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftFlag {
    LowConfidence { average: f64 },
    HighVariance { std_dev: f64 },
    LabelDominance { label: String, share: f64 },
}

impl std::fmt::Display for DriftFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftFlag::LowConfidence { average } => write!(f, "Low average confidence: {average:.3}"),
            DriftFlag::HighVariance { std_dev } => write!(f, "High confidence variance: {std_dev:.3}"),
            DriftFlag::LabelDominance { label, share } => {
                write!(f, "Prediction distribution skew: {label} at {share:.3}")
            }
        }
    }
}

/// Outcome of evaluating one stage's window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub stage: String,
    pub sample_count: usize,
    pub drift_detected: bool,
    /// True when the window held fewer records than the minimum
    pub insufficient_data: bool,
    pub avg_confidence: f64,
    pub confidence_std: f64,
    pub label_distribution: BTreeMap<String, usize>,
    pub flags: Vec<DriftFlag>,
}

impl DriftReport {
    /// Evaluate the drift policy over `(label, confidence)` samples
    pub fn evaluate<'a>(
        stage: &str,
        samples: impl IntoIterator<Item = (&'a str, f64)>,
        thresholds: &DriftThresholds,
    ) -> Self {
        let mut confidences = Vec::new();
        let mut label_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for (label, confidence) in samples {
            confidences.push(confidence);
            *label_distribution.entry(label.to_string()).or_insert(0) += 1;
        }

        let n = confidences.len();
        let mut report = Self {
            stage: stage.to_string(),
            sample_count: n,
            drift_detected: false,
            insufficient_data: n < thresholds.min_samples || n == 0,
            avg_confidence: 0.0,
            confidence_std: 0.0,
            label_distribution,
            flags: Vec::new(),
        };
        if report.insufficient_data {
            return report;
        }

        let mean = confidences.iter().sum::<f64>() / n as f64;
        let var = confidences.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
        report.avg_confidence = mean;
        report.confidence_std = var.sqrt();

        if mean < thresholds.min_avg_confidence {
            report.flags.push(DriftFlag::LowConfidence { average: mean });
        }
        if report.confidence_std > thresholds.max_confidence_std {
            report.flags.push(DriftFlag::HighVariance {
                std_dev: report.confidence_std,
            });
        }
        // First label wins ties, in label order
        let mut dominant: Option<(&String, usize)> = None;
        for (label, count) in &report.label_distribution {
            if dominant.map_or(true, |(_, best)| *count > best) {
                dominant = Some((label, *count));
            }
        }
        if let Some((label, count)) = dominant {
            let share = count as f64 / n as f64;
            if share > thresholds.max_dominant_share {
                report.flags.push(DriftFlag::LabelDominance {
                    label: label.clone(),
                    share,
                });
            }
        }

        report.drift_detected = !report.flags.is_empty();
        report
    }
}
