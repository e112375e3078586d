//! Stratified splitting, cross-validation and classification metrics

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Precision / recall / F1 / support of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation summary stored with a stage artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    /// Hold-out accuracy
    pub accuracy: f64,
    /// Hold-out support-weighted F1
    pub f1_weighted: f64,
    /// Mean weighted F1 over the CV folds
    pub cv_mean: f64,
    /// Standard deviation of weighted F1 over the CV folds
    pub cv_std: f64,
    pub cv_scores: Vec<f64>,
    pub per_class: Vec<ClassMetrics>,
    /// Selected features ranked by forest importance, descending
    pub feature_importance: Vec<(String, f64)>,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Stratified hold-out split of row indices.
///
/// Each class contributes `round(n_c * test_size)` rows to the test side, but
/// always keeps at least one row for training.
pub fn stratified_split(labels: &[usize], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for mut members in group_by_class(labels) {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize).min(members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Stratified k-fold over positions `0..labels.len()`.
///
/// Rows of each class are dealt round-robin across folds. Folds that end up
/// with an empty validation side are dropped.
pub fn stratified_kfold(labels: &[usize], k: usize, seed: u64) -> Vec<(Vec<usize>, Vec<usize>)> {
    if k < 2 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; labels.len()];
    let mut offset = 0;
    for mut members in group_by_class(labels) {
        members.shuffle(&mut rng);
        for (pos, row) in members.into_iter().enumerate() {
            fold_of[row] = (pos + offset) % k;
        }
        offset += 1;
    }

    (0..k)
        .map(|fold| {
            let (val, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|r| fold_of[*r] == fold);
            (train, val)
        })
        .filter(|(train, val)| !val.is_empty() && !train.is_empty())
        .collect()
}

fn group_by_class(labels: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); n_classes];
    for (row, label) in labels.iter().enumerate() {
        groups[*label].push(row);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Per-class report over every class in `classes`
pub fn classification_report(truth: &[usize], predicted: &[usize], classes: &[String]) -> Vec<ClassMetrics> {
    classes
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let tp = truth.iter().zip(predicted).filter(|(t, p)| **t == c && **p == c).count() as f64;
            let predicted_c = predicted.iter().filter(|p| **p == c).count() as f64;
            let support = truth.iter().filter(|t| **t == c).count();
            let precision = if predicted_c > 0.0 { tp / predicted_c } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

/// Support-weighted mean F1
pub fn weighted_f1(report: &[ClassMetrics]) -> f64 {
    let support: usize = report.iter().map(|m| m.support).sum();
    if support == 0 {
        return 0.0;
    }
    report.iter().map(|m| m.f1 * m.support as f64).sum::<f64>() / support as f64
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_stratified() {
        let labels: Vec<usize> = (0..50).map(|i| if i < 40 { 0 } else { 1 }).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42);
        assert_eq!(train.len() + test.len(), 50);
        assert_eq!(test.iter().filter(|i| labels[**i] == 0).count(), 8);
        assert_eq!(test.iter().filter(|i| labels[**i] == 1).count(), 2);
    }

    #[test]
    fn test_split_keeps_singletons_in_train() {
        let labels = vec![0, 0, 0, 0, 0, 1];
        let (train, test) = stratified_split(&labels, 0.2, 1);
        assert!(train.contains(&5));
        assert!(!test.contains(&5));
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels: Vec<usize> = (0..30).map(|i| i % 3).collect();
        assert_eq!(stratified_split(&labels, 0.2, 9), stratified_split(&labels, 0.2, 9));
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let labels: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let folds = stratified_kfold(&labels, 5, 42);
        assert_eq!(folds.len(), 5);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, v)| v.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        for (train, val) in &folds {
            assert_eq!(train.len() + val.len(), 20);
            assert_eq!(val.iter().filter(|r| labels[**r] == 0).count(), 2);
        }
    }

    #[test]
    fn test_kfold_drops_empty_folds() {
        let folds = stratified_kfold(&[0, 1], 5, 42);
        assert_eq!(folds.len(), 2);
        assert!(stratified_kfold(&[0, 1], 1, 42).is_empty());
    }

    #[test]
    fn test_report_and_weighted_f1() {
        let classes = vec!["a".to_string(), "b".to_string()];
        let truth = vec![0, 0, 1, 1];
        let predicted = vec![0, 1, 1, 1];
        let report = classification_report(&truth, &predicted, &classes);
        assert_eq!(report[0].precision, 1.0);
        assert_eq!(report[0].recall, 0.5);
        assert!((report[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report[1].recall, 1.0);
        let f1 = weighted_f1(&report);
        assert!((f1 - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-12);
        assert_eq!(accuracy(&truth, &predicted), 0.75);
    }

    #[test]
    fn test_mean_std() {
        assert_eq!(mean_std(&[]), (0.0, 0.0));
        assert_eq!(mean_std(&[2.0, 4.0]), (3.0, 1.0));
    }
}
