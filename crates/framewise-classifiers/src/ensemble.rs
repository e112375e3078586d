//! Soft-voting ensemble of three tree classifiers

use crate::config::StageConfig;
use crate::tree::{GradientBoosting, RandomForest};
use serde::{Deserialize, Serialize};

/// A fitted classifier that outputs a class-probability vector
pub trait ProbabilisticClassifier: Send + Sync {
    /// Member name for logging
    fn name(&self) -> &str;

    /// Probabilities over the encoded classes, summing to 1
    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;
}

impl ProbabilisticClassifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        RandomForest::predict_proba(self, row)
    }
}

impl ProbabilisticClassifier for GradientBoosting {
    fn name(&self) -> &str {
        match self.policy() {
            crate::tree::GrowthPolicy::DepthWise { .. } => "boosting_depthwise",
            crate::tree::GrowthPolicy::LeafWise { .. } => "boosting_leafwise",
        }
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        GradientBoosting::predict_proba(self, row)
    }
}

/// Bagging forest plus depth-wise and leaf-wise boosting, averaged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    n_classes: usize,
    forest: RandomForest,
    depthwise: GradientBoosting,
    leafwise: GradientBoosting,
}

impl SoftVotingEnsemble {
    /// Train all three members on the same preprocessed matrix
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, config: &StageConfig, seed: u64) -> Self {
        let forest = RandomForest::fit(x, y, n_classes, &config.forest, seed);
        let depthwise = GradientBoosting::fit(x, y, n_classes, &config.depthwise, seed);
        let leafwise = GradientBoosting::fit(x, y, n_classes, &config.leafwise, seed.wrapping_add(1));
        Self {
            n_classes,
            forest,
            depthwise,
            leafwise,
        }
    }

    pub fn members(&self) -> [&dyn ProbabilisticClassifier; 3] {
        [&self.forest, &self.depthwise, &self.leafwise]
    }

    /// Mean of the members' probability vectors
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let members = self.members();
        let mut avg = vec![0.0; self.n_classes];
        for member in members {
            for (a, p) in avg.iter_mut().zip(member.predict_proba(row)) {
                *a += p;
            }
        }
        let n = members.len() as f64;
        avg.iter_mut().for_each(|a| *a /= n);
        avg
    }

    /// Argmax class index and its probability; ties go to the lower index
    pub fn predict(&self, row: &[f64]) -> (usize, f64) {
        argmax(&self.predict_proba(row))
    }

    /// Importances from the bagging member, per input column
    pub fn feature_importances(&self) -> &[f64] {
        self.forest.feature_importances()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Structural check of all three members
    pub fn check(&self) -> Result<(), String> {
        if self.n_classes == 0 {
            return Err("ensemble has no classes".to_string());
        }
        self.forest.check(self.n_classes)?;
        self.depthwise.check(self.n_classes)?;
        self.leafwise.check(self.n_classes)
    }
}

/// Index and value of the largest element, first one on ties
pub fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}
