//! Integration tests for the prediction monitor

use framewise_core::FeatureVector;
use framewise_telemetry::{PredictionMonitor, Window};
use proptest::prelude::*;
use std::sync::Arc;

fn features(v: f64) -> FeatureVector {
    FeatureVector::from([("building_length".to_string(), v)])
}

#[test]
fn test_concurrent_writers_stay_bounded() {
    let monitor = Arc::new(PredictionMonitor::with_capacity(100));
    std::thread::scope(|scope| {
        for t in 0..8 {
            let monitor = Arc::clone(&monitor);
            scope.spawn(move || {
                for i in 0..50 {
                    monitor.log("member_role", &features(i as f64), &format!("T{t}"), 0.9, None);
                }
            });
        }
    });
    assert_eq!(monitor.len(), 100);
    let snapshot = monitor.metrics().snapshot();
    assert_eq!(snapshot.logged, 400);
    assert_eq!(snapshot.evicted, 300);
}

#[test]
fn test_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("predictions.jsonl");

    let monitor = PredictionMonitor::default();
    let id = monitor.log("building_type", &features(120.0), "GABLE_HANGAR", 0.82, None);
    monitor.log("frame_system", &features(120.0), "MOMENT", 0.91, None);
    monitor.record_actual(id, "GABLE_HANGAR");

    assert_eq!(monitor.save_snapshot(&path).unwrap(), 2);
    let records = PredictionMonitor::read_snapshot(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].actual.as_deref(), Some("GABLE_HANGAR"));
    assert_eq!(records[1].input_features["building_length"], 120.0);
}

#[test]
fn test_drift_window_limits_samples() {
    let monitor = PredictionMonitor::default();
    for i in 0..20 {
        let label = if i % 2 == 0 { "A" } else { "B" };
        monitor.log("frame_system", &features(0.0), label, 0.95, None);
    }
    assert!(!monitor.detect_drift("frame_system", Window::All).drift_detected);
    assert!(monitor.detect_drift("frame_system", Window::Last(5)).insufficient_data);
}

proptest! {
    #[test]
    fn prop_buffer_never_exceeds_capacity(capacity in 1usize..40, writes in 0usize..120) {
        let monitor = PredictionMonitor::with_capacity(capacity);
        let mut ids = Vec::new();
        for i in 0..writes {
            ids.push(monitor.log("building_type", &features(i as f64), "A", 0.5, None));
            prop_assert!(monitor.len() <= capacity);
        }
        prop_assert_eq!(monitor.len(), writes.min(capacity));

        // the survivors are exactly the newest writes
        let held: Vec<_> = monitor.records("building_type", Window::All).into_iter().map(|r| r.id).collect();
        let newest: Vec<_> = ids[writes - writes.min(capacity)..].to_vec();
        prop_assert_eq!(held, newest);
    }
}
