//! Monitor counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-process counters kept by the prediction monitor
#[derive(Clone)]
pub struct MonitorMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    logged: AtomicU64,
    evicted: AtomicU64,
    ground_truth: AtomicU64,
    correct: AtomicU64,
    drift_alerts: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                logged: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
                ground_truth: AtomicU64::new(0),
                correct: AtomicU64::new(0),
                drift_alerts: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_logged(&self) {
        self.inner.logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.inner.evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a ground-truth label arriving for a logged prediction
    pub fn record_ground_truth(&self, correct: bool) {
        self.inner.ground_truth.fetch_add(1, Ordering::Relaxed);
        if correct {
            self.inner.correct.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_drift_alert(&self) {
        self.inner.drift_alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MonitorMetricsSnapshot {
        MonitorMetricsSnapshot {
            logged: self.inner.logged.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
            ground_truth: self.inner.ground_truth.load(Ordering::Relaxed),
            correct: self.inner.correct.load(Ordering::Relaxed),
            drift_alerts: self.inner.drift_alerts.load(Ordering::Relaxed),
        }
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the monitor counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorMetricsSnapshot {
    pub logged: u64,
    pub evicted: u64,
    pub ground_truth: u64,
    pub correct: u64,
    pub drift_alerts: u64,
}

impl MonitorMetricsSnapshot {
    /// Lifetime accuracy over every prediction that received ground truth
    pub fn lifetime_accuracy(&self) -> Option<f64> {
        if self.ground_truth == 0 {
            None
        } else {
            Some(self.correct as f64 / self.ground_truth as f64)
        }
    }
}
