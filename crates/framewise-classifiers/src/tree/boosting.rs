//! Multiclass gradient boosting with softmax loss
//!
//! One regression tree per class per round, fit on the second-order
//! expansion of the softmax cross-entropy. Two growth policies are provided:
//! level-by-level up to a depth limit, and best-first up to a leaf budget.

use super::binning::BinnedMatrix;
use super::{DecisionTree, TreeNode};
use crate::config::BoostingParams;
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};
use serde::{Deserialize, Serialize};

const L2_REGULARIZATION: f64 = 1.0;
const MIN_CHILD_WEIGHT: f64 = 1e-3;
const MIN_PRIOR: f64 = 1e-6;

/// How trees are grown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Split every eligible leaf until `max_depth`
    DepthWise { max_depth: usize },
    /// Split the highest-gain leaf first until `num_leaves` leaves exist
    LeafWise { num_leaves: usize, max_depth: usize },
}

impl GrowthPolicy {
    pub fn from_params(params: &BoostingParams) -> Self {
        match params.num_leaves {
            Some(num_leaves) => Self::LeafWise {
                num_leaves: num_leaves.max(2),
                max_depth: params.max_depth,
            },
            None => Self::DepthWise {
                max_depth: params.max_depth,
            },
        }
    }

    fn max_depth(&self) -> usize {
        match self {
            Self::DepthWise { max_depth } | Self::LeafWise { max_depth, .. } => *max_depth,
        }
    }
}

/// Gradient-boosted tree classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_classes: usize,
    policy: GrowthPolicy,
    base_score: Vec<f64>,
    /// `rounds[r][k]` is the tree of class `k` in round `r`
    rounds: Vec<Vec<DecisionTree>>,
}

impl GradientBoosting {
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &BoostingParams,
        seed: u64,
    ) -> Self {
        let policy = GrowthPolicy::from_params(params);
        let n = x.len();

        let mut counts = vec![0usize; n_classes];
        for label in y {
            counts[*label] += 1;
        }
        let base_score: Vec<f64> = counts
            .iter()
            .map(|c| (*c as f64 / n.max(1) as f64).max(MIN_PRIOR).ln())
            .collect();

        let mut model = Self {
            n_classes,
            policy,
            base_score,
            rounds: Vec::new(),
        };
        if n_classes < 2 || n == 0 {
            return model;
        }

        let data = BinnedMatrix::new(x);
        let n_features = data.n_features();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scores: Vec<Vec<f64>> = vec![model.base_score.clone(); n];
        let row_budget = ((params.subsample * n as f64) as usize).clamp(1, n);
        let col_budget = ((params.colsample * n_features as f64).ceil() as usize).clamp(1, n_features.max(1));

        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for _ in 0..params.n_estimators {
            let probs: Vec<Vec<f64>> = scores.iter().map(|s| softmax(s)).collect();
            let mut rows = index::sample(&mut rng, n, row_budget).into_vec();
            rows.sort_unstable();
            let cols = if n_features == 0 {
                Vec::new()
            } else {
                index::sample(&mut rng, n_features, col_budget).into_vec()
            };

            let mut round = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                for i in 0..n {
                    let target = if y[i] == k { 1.0 } else { 0.0 };
                    let p = probs[i][k];
                    grad[i] = p - target;
                    hess[i] = (p * (1.0 - p)).max(1e-16);
                }
                let tree = RegressionTreeBuilder {
                    data: &data,
                    grad: &grad,
                    hess: &hess,
                    cols: &cols,
                    policy,
                    learning_rate: params.learning_rate,
                }
                .grow(rows.clone());

                for (i, row) in x.iter().enumerate() {
                    scores[i][k] += tree.evaluate(row)[0];
                }
                round.push(tree);
            }
            model.rounds.push(round);
        }

        tracing::debug!(rounds = model.rounds.len(), ?policy, "trained gradient boosting");
        model
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut score = self.base_score.clone();
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                if let (Some(s), Some(v)) = (score.get_mut(k), tree.evaluate(row).first()) {
                    *s += v;
                }
            }
        }
        softmax(&score)
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Check one single-score tree per class per round
    pub fn check(&self, n_classes: usize) -> Result<(), String> {
        if self.n_classes != n_classes || self.base_score.len() != n_classes {
            return Err(format!(
                "boosting has {} classes and {} base scores, expected {n_classes}",
                self.n_classes,
                self.base_score.len()
            ));
        }
        for (r, round) in self.rounds.iter().enumerate() {
            if round.len() != n_classes {
                return Err(format!("boosting round {r} has {} trees, expected {n_classes}", round.len()));
            }
            for tree in round {
                tree.check(1).map_err(|e| format!("boosting round {r}: {e}"))?;
            }
        }
        Ok(())
    }

    /// Largest leaf count over all trees
    pub fn max_leaves(&self) -> usize {
        self.rounds
            .iter()
            .flatten()
            .map(DecisionTree::leaf_count)
            .max()
            .unwrap_or(0)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

struct Candidate {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<SplitInfo>,
}

struct SplitInfo {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct RegressionTreeBuilder<'a> {
    data: &'a BinnedMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    cols: &'a [usize],
    policy: GrowthPolicy,
    learning_rate: f64,
}

impl RegressionTreeBuilder<'_> {
    fn grow(&self, rows: Vec<usize>) -> DecisionTree {
        let mut nodes = vec![TreeNode::Leaf { value: vec![0.0] }];
        let mut pending = vec![self.candidate(0, rows, 0)];
        let mut leaves = 1usize;

        loop {
            let pick = match self.policy {
                GrowthPolicy::DepthWise { .. } => pending.iter().position(|c| c.split.is_some()),
                GrowthPolicy::LeafWise { num_leaves, .. } if leaves < num_leaves => pending
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| c.split.as_ref().map(|s| (i, s.gain)))
                    .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
                    .map(|(i, _)| i),
                GrowthPolicy::LeafWise { .. } => None,
            };
            let Some(i) = pick else { break };

            let parent = pending.swap_remove(i);
            let Some(split) = parent.split else { continue };
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = parent
                .rows
                .into_iter()
                .partition(|r| self.data.bin(split.feature, *r) <= split.bin);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: vec![0.0] });
            nodes.push(TreeNode::Leaf { value: vec![0.0] });
            nodes[parent.node] = TreeNode::Split {
                feature: split.feature,
                threshold: self.data.threshold(split.feature, split.bin),
                left,
                right,
            };
            pending.push(self.candidate(left, left_rows, parent.depth + 1));
            pending.push(self.candidate(right, right_rows, parent.depth + 1));
            leaves += 1;
        }

        for c in pending {
            nodes[c.node] = TreeNode::Leaf {
                value: vec![self.leaf_weight(&c.rows)],
            };
        }
        DecisionTree::from_nodes(nodes)
    }

    fn candidate(&self, node: usize, rows: Vec<usize>, depth: usize) -> Candidate {
        let split = if depth < self.policy.max_depth() && rows.len() >= 2 {
            self.best_split(&rows)
        } else {
            None
        };
        Candidate {
            node,
            rows,
            depth,
            split,
        }
    }

    fn leaf_weight(&self, rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|r| self.grad[*r]).sum();
        let h: f64 = rows.iter().map(|r| self.hess[*r]).sum();
        -g / (h + L2_REGULARIZATION) * self.learning_rate
    }

    fn best_split(&self, rows: &[usize]) -> Option<SplitInfo> {
        let g_total: f64 = rows.iter().map(|r| self.grad[*r]).sum();
        let h_total: f64 = rows.iter().map(|r| self.hess[*r]).sum();
        let parent = g_total * g_total / (h_total + L2_REGULARIZATION);

        let mut best: Option<SplitInfo> = None;
        for &feature in self.cols {
            let n_bins = self.data.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist = vec![(0.0f64, 0.0f64, 0usize); n_bins];
            for r in rows {
                let h = &mut hist[self.data.bin(feature, *r)];
                h.0 += self.grad[*r];
                h.1 += self.hess[*r];
                h.2 += 1;
            }

            let (mut gl, mut hl, mut nl) = (0.0, 0.0, 0usize);
            for (bin, (g, h, c)) in hist.iter().enumerate().take(n_bins - 1) {
                gl += g;
                hl += h;
                nl += c;
                let (gr, hr, nr) = (g_total - gl, h_total - hl, rows.len() - nl);
                if nl == 0 || nr == 0 || hl < MIN_CHILD_WEIGHT || hr < MIN_CHILD_WEIGHT {
                    continue;
                }
                let gain = gl * gl / (hl + L2_REGULARIZATION) + gr * gr / (hr + L2_REGULARIZATION) - parent;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitInfo { feature, bin, gain });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(num_leaves: Option<usize>) -> BoostingParams {
        BoostingParams {
            n_estimators: 20,
            learning_rate: 0.3,
            max_depth: 4,
            num_leaves,
            subsample: 0.8,
            colsample: 1.0,
        }
    }

    fn stripes() -> (Vec<Vec<f64>>, Vec<usize>) {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y = (0..60).map(|i| i / 20).collect();
        (x, y)
    }

    #[test]
    fn test_depthwise_learns_stripes() {
        let (x, y) = stripes();
        let full_sample = BoostingParams {
            subsample: 1.0,
            ..params(None)
        };
        let model = GradientBoosting::fit(&x, &y, 3, &full_sample, 42);
        assert_eq!(model.n_rounds(), 20);
        assert!(matches!(model.policy(), GrowthPolicy::DepthWise { max_depth: 4 }));
        for (row, label) in x.iter().zip(&y) {
            let p = model.predict_proba(row);
            let argmax = (0..3).max_by(|a, b| p[*a].total_cmp(&p[*b])).unwrap();
            assert_eq!(argmax, *label);
        }
    }

    #[test]
    fn test_leafwise_respects_leaf_budget() {
        let (x, y) = stripes();
        let model = GradientBoosting::fit(&x, &y, 3, &params(Some(3)), 42);
        assert!(model.max_leaves() <= 3);
        let p = model.predict_proba(&[50.0, 1.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p[2] > p[0]);
    }

    #[test]
    fn test_single_class_is_certain() {
        let x = vec![vec![0.0], vec![1.0]];
        let model = GradientBoosting::fit(&x, &[0, 0], 1, &params(None), 1);
        assert_eq!(model.n_rounds(), 0);
        assert_eq!(model.predict_proba(&[3.0]), vec![1.0]);
    }

    #[test]
    fn test_softmax_stable() {
        let p = softmax(&[1000.0, 1000.0]);
        assert_eq!(p, vec![0.5, 0.5]);
    }
}
