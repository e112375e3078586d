//! Prediction monitor
//!
//! Keeps a bounded history of predictions (oldest evicted first), accepts
//! ground truth after the fact, and evaluates accuracy and drift per stage
//! over a time or count window. Safe to share between concurrent callers.

use crate::config::MonitorConfig;
use crate::drift::DriftReport;
use crate::metrics::MonitorMetrics;
use chrono::{DateTime, Duration, Utc};
use framewise_core::{FeatureVector, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One logged prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub input_features: FeatureVector,
    pub prediction: String,
    pub confidence: f64,
    /// Ground truth, when known
    pub actual: Option<String>,
}

/// Selection of records to evaluate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Every record still held
    All,
    /// The most recent `n` records of the stage
    Last(usize),
    /// Records newer than now minus the duration
    Since(Duration),
}

impl Window {
    pub fn hours(hours: i64) -> Self {
        Window::Since(Duration::hours(hours))
    }
}

/// Accuracy and drift of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub prediction_count: usize,
    pub recent_accuracy: Option<f64>,
    pub drift: DriftReport,
}

/// Summary over every stage seen by the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub generated_at: DateTime<Utc>,
    pub total_predictions: usize,
    pub window_hours: i64,
    pub stages: BTreeMap<String, StageReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Warning,
    Degraded,
}

/// Overall health: drift anywhere degrades, inactivity warns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Bounded, thread-safe prediction log
pub struct PredictionMonitor {
    config: MonitorConfig,
    records: RwLock<VecDeque<PredictionRecord>>,
    metrics: MonitorMetrics,
}

impl PredictionMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: MonitorConfig { capacity, ..config },
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(MonitorConfig::with_capacity(capacity))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// Append a prediction, evicting the oldest record when full
    pub fn log(
        &self,
        stage: &str,
        input_features: &FeatureVector,
        prediction: &str,
        confidence: f64,
        actual: Option<String>,
    ) -> Uuid {
        let record = PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            stage: stage.to_string(),
            input_features: input_features.clone(),
            prediction: prediction.to_string(),
            confidence,
            actual,
        };
        let id = record.id;
        if let Some(actual) = &record.actual {
            self.metrics.record_ground_truth(*actual == record.prediction);
        }

        let mut records = self.records.write();
        records.push_back(record);
        while records.len() > self.config.capacity {
            if let Some(evicted) = records.pop_front() {
                debug!(id = %evicted.id, stage = %evicted.stage, "evicted oldest prediction record");
                self.metrics.record_evicted();
            }
        }
        drop(records);

        self.metrics.record_logged();
        id
    }

    /// Attach ground truth to a logged prediction.
    ///
    /// Returns false when the record has already been evicted.
    pub fn record_actual(&self, id: Uuid, actual: impl Into<String>) -> bool {
        let actual = actual.into();
        let mut records = self.records.write();
        let Some(record) = records.iter_mut().rev().find(|r| r.id == id) else {
            return false;
        };
        if record.actual.is_none() {
            self.metrics.record_ground_truth(record.prediction == actual);
        }
        record.actual = Some(actual);
        true
    }

    /// Copy of the records of `stage` inside `window`, oldest first
    pub fn records(&self, stage: &str, window: Window) -> Vec<PredictionRecord> {
        let records = self.records.read();
        let of_stage = records.iter().filter(|r| r.stage == stage);
        match window {
            Window::All => of_stage.cloned().collect(),
            Window::Since(duration) => {
                let cutoff = Utc::now() - duration;
                of_stage.filter(|r| r.timestamp > cutoff).cloned().collect()
            }
            Window::Last(n) => {
                let mut last: Vec<PredictionRecord> = of_stage.rev().take(n).cloned().collect();
                last.reverse();
                last
            }
        }
    }

    /// Accuracy over records with ground truth; `None` when there are none
    pub fn recent_accuracy(&self, stage: &str, window: Window) -> Option<f64> {
        let labeled: Vec<(String, String)> = self
            .records(stage, window)
            .into_iter()
            .filter_map(|r| r.actual.map(|actual| (r.prediction, actual)))
            .collect();
        if labeled.is_empty() {
            return None;
        }
        let correct = labeled.iter().filter(|(p, a)| p == a).count();
        Some(correct as f64 / labeled.len() as f64)
    }

    /// Evaluate the drift policy for one stage without raising an alert
    pub fn drift_report(&self, stage: &str, window: Window) -> DriftReport {
        let records = self.records(stage, window);
        DriftReport::evaluate(
            stage,
            records.iter().map(|r| (r.prediction.as_str(), r.confidence)),
            &self.config.drift,
        )
    }

    /// Evaluate the drift policy and alert when it trips.
    ///
    /// An alert logs a warning and counts toward `drift_alerts`. Read-only
    /// views such as [`report`](Self::report) use
    /// [`drift_report`](Self::drift_report) instead.
    pub fn detect_drift(&self, stage: &str, window: Window) -> DriftReport {
        let report = self.drift_report(stage, window);
        if report.drift_detected {
            warn!(
                stage,
                samples = report.sample_count,
                avg_confidence = report.avg_confidence,
                confidence_std = report.confidence_std,
                flags = report.flags.len(),
                "prediction drift detected"
            );
            self.metrics.record_drift_alert();
            ::metrics::counter!("framewise_drift_alerts_total", "stage" => stage.to_string()).increment(1);
        }
        report
    }

    /// Stages with at least one record held
    pub fn stages(&self) -> Vec<String> {
        let records = self.records.read();
        let stages: BTreeSet<&str> = records.iter().map(|r| r.stage.as_str()).collect();
        stages.into_iter().map(str::to_string).collect()
    }

    /// Accuracy and drift per stage over the configured report window
    pub fn report(&self) -> MonitoringReport {
        let window = Window::hours(self.config.report_window_hours);
        let stages = self
            .stages()
            .into_iter()
            .map(|stage| {
                let report = StageReport {
                    prediction_count: self.records(&stage, window).len(),
                    recent_accuracy: self.recent_accuracy(&stage, window),
                    drift: self.drift_report(&stage, window),
                };
                (stage, report)
            })
            .collect();

        MonitoringReport {
            generated_at: Utc::now(),
            total_predictions: self.len(),
            window_hours: self.config.report_window_hours,
            stages,
        }
    }

    pub fn health(&self) -> HealthStatus {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let hour_ago = Utc::now() - Duration::hours(1);
        let active = self.records.read().iter().any(|r| r.timestamp > hour_ago);
        if !active {
            warnings.push("No predictions in the last hour".to_string());
        }

        let window = Window::hours(self.config.health_window_hours);
        for stage in self.stages() {
            let drift = self.drift_report(&stage, window);
            issues.extend(drift.flags.iter().map(|flag| format!("{stage}: {flag}")));
        }

        let status = if !issues.is_empty() {
            HealthState::Degraded
        } else if !warnings.is_empty() {
            HealthState::Warning
        } else {
            HealthState::Healthy
        };
        HealthStatus {
            status,
            issues,
            warnings,
        }
    }

    /// Write every held record as JSON lines; returns the record count
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let records: Vec<PredictionRecord> = self.records.read().iter().cloned().collect();

        let mut writer = BufWriter::new(File::create(path)?);
        for record in &records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        info!(path = %path.display(), records = records.len(), "saved monitor snapshot");
        Ok(records.len())
    }

    /// Read a snapshot written by [`save_snapshot`](Self::save_snapshot)
    pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<PredictionRecord>> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl Default for PredictionMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        FeatureVector::from([("building_height".to_string(), 12.0)])
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let monitor = PredictionMonitor::with_capacity(3);
        let first = monitor.log("building_type", &features(), "A", 0.9, None);
        for label in ["B", "C", "D"] {
            monitor.log("building_type", &features(), label, 0.9, None);
        }
        assert_eq!(monitor.len(), 3);
        assert!(!monitor.record_actual(first, "A"));
        let labels: Vec<String> = monitor
            .records("building_type", Window::All)
            .into_iter()
            .map(|r| r.prediction)
            .collect();
        assert_eq!(labels, vec!["B", "C", "D"]);
        assert_eq!(monitor.metrics().snapshot().evicted, 1);
    }

    #[test]
    fn test_accuracy_requires_ground_truth() {
        let monitor = PredictionMonitor::default();
        let id = monitor.log("frame_system", &features(), "MOMENT", 0.8, None);
        assert_eq!(monitor.recent_accuracy("frame_system", Window::All), None);

        monitor.log("frame_system", &features(), "TRUSS", 0.8, Some("BRACED".into()));
        assert!(monitor.record_actual(id, "MOMENT"));
        assert_eq!(monitor.recent_accuracy("frame_system", Window::All), Some(0.5));
        assert_eq!(monitor.recent_accuracy("frame_system", Window::hours(24)), Some(0.5));
        assert_eq!(monitor.recent_accuracy("building_type", Window::All), None);
    }

    #[test]
    fn test_last_window_counts_per_stage() {
        let monitor = PredictionMonitor::default();
        for i in 0..5 {
            monitor.log("member_role", &features(), &format!("R{i}"), 0.9, None);
            monitor.log("building_type", &features(), "X", 0.9, None);
        }
        let last = monitor.records("member_role", Window::Last(2));
        let labels: Vec<&str> = last.iter().map(|r| r.prediction.as_str()).collect();
        assert_eq!(labels, vec!["R3", "R4"]);
    }

    #[test]
    fn test_drift_and_health() {
        let monitor = PredictionMonitor::default();
        for _ in 0..12 {
            monitor.log("building_type", &features(), "GABLE", 0.4, None);
        }
        let drift = monitor.detect_drift("building_type", Window::All);
        assert!(drift.drift_detected);
        assert_eq!(drift.sample_count, 12);

        let health = monitor.health();
        assert_eq!(health.status, HealthState::Degraded);
        assert!(health.issues.iter().all(|i| i.starts_with("building_type:")));
        assert!(health.warnings.is_empty());
    }

    #[test]
    fn test_only_detect_drift_raises_alerts() {
        let monitor = PredictionMonitor::default();
        for _ in 0..12 {
            monitor.log("building_type", &features(), "GABLE", 0.4, None);
        }

        assert!(monitor.drift_report("building_type", Window::All).drift_detected);
        assert!(monitor.report().stages["building_type"].drift.drift_detected);
        assert_eq!(monitor.health().status, HealthState::Degraded);
        assert_eq!(monitor.metrics().snapshot().drift_alerts, 0);

        assert!(monitor.detect_drift("building_type", Window::All).drift_detected);
        assert_eq!(monitor.metrics().snapshot().drift_alerts, 1);
        monitor.report();
        assert_eq!(monitor.metrics().snapshot().drift_alerts, 1);
    }

    #[test]
    fn test_idle_monitor_warns() {
        let health = PredictionMonitor::default().health();
        assert_eq!(health.status, HealthState::Warning);
        assert_eq!(health.warnings.len(), 1);
    }

    #[test]
    fn test_report_covers_each_stage() {
        let monitor = PredictionMonitor::default();
        monitor.log("building_type", &features(), "A", 0.9, Some("A".into()));
        monitor.log("frame_system", &features(), "MOMENT", 0.9, None);
        let report = monitor.report();
        assert_eq!(report.total_predictions, 2);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages["building_type"].recent_accuracy, Some(1.0));
        assert!(report.stages["frame_system"].drift.insufficient_data);
    }
}
