//! Framewise Telemetry
//!
//! Production monitoring for Framewise predictions.
//!
//! Provides:
//! - A bounded, thread-safe log of recent predictions
//! - Accuracy over predictions whose ground truth arrived later
//! - Confidence and label-distribution drift detection
//! - Monitoring reports, health status, and on-demand snapshots

pub mod config;
pub mod drift;
pub mod metrics;
pub mod monitor;

pub use config::MonitorConfig;
pub use drift::{DriftFlag, DriftReport, DriftThresholds};
pub use metrics::{MonitorMetrics, MonitorMetricsSnapshot};
pub use monitor::{
    HealthState, HealthStatus, MonitoringReport, PredictionMonitor, PredictionRecord, StageReport,
    Window,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::MonitorConfig;
    pub use crate::drift::{DriftReport, DriftThresholds};
    pub use crate::monitor::{PredictionMonitor, Window};
}
