//! Bagged Gini CART forest

use super::binning::BinnedMatrix;
use super::{DecisionTree, TreeNode};
use crate::config::ForestParams;
use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest classifier with impurity-based feature importances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Train `params.n_estimators` trees on bootstrap samples.
    ///
    /// Tree `i` is seeded with `seed + i`, so the result does not depend on
    /// how trees are spread over threads.
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: &ForestParams, seed: u64) -> Self {
        let data = BinnedMatrix::new(x);
        let n_features = data.n_features();
        let n_trees = params.n_estimators;
        let workers = num_cpus::get().clamp(1, n_trees.max(1));

        let mut grown: Vec<(usize, DecisionTree, Vec<f64>)> = std::thread::scope(|scope| {
            let data = &data;
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    scope.spawn(move || {
                        (w..n_trees)
                            .step_by(workers)
                            .map(|i| {
                                let (tree, imp) =
                                    grow_tree(data, y, n_classes, params, seed.wrapping_add(i as u64));
                                (i, tree, imp)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });
        grown.sort_by_key(|(i, _, _)| *i);

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(grown.len());
        for (_, tree, imp) in grown {
            let total: f64 = imp.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&imp) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        normalize(&mut importances);

        debug!(trees = trees.len(), workers, "trained random forest");
        Self {
            trees,
            n_classes,
            feature_importances: importances,
        }
    }

    /// Average of the trees' leaf class distributions
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![1.0 / self.n_classes.max(1) as f64; self.n_classes];
        }
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.evaluate(row)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }

    /// Normalized mean impurity decrease per input column
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Check every tree holds `n_classes`-wide leaves
    pub fn check(&self, n_classes: usize) -> Result<(), String> {
        if self.n_classes != n_classes {
            return Err(format!("forest has {} classes, expected {n_classes}", self.n_classes));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(n_classes).map_err(|e| format!("forest tree {i}: {e}"))?;
        }
        Ok(())
    }
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|c| (*c as f64 / n).powi(2)).sum::<f64>()
}

fn grow_tree(
    data: &BinnedMatrix,
    y: &[usize],
    n_classes: usize,
    params: &ForestParams,
    seed: u64,
) -> (DecisionTree, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = data.n_rows();
    let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let n_features = data.n_features();

    let mut builder = CartBuilder {
        data,
        y,
        n_classes,
        params,
        max_features: ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1)),
        rng,
        nodes: Vec::new(),
        importances: vec![0.0; n_features],
    };
    builder.build(sample, 0);
    (DecisionTree::from_nodes(builder.nodes), builder.importances)
}

struct CartBuilder<'a> {
    data: &'a BinnedMatrix,
    y: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    bin: usize,
    decrease: f64,
}

impl CartBuilder<'_> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let n = samples.len();
        let mut counts = vec![0usize; self.n_classes];
        for s in &samples {
            counts[self.y[*s]] += 1;
        }
        let impurity = gini(&counts, n);

        let idx = self.nodes.len();
        self.nodes.push(leaf(&counts, n));

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split.max(2)
            || impurity <= 0.0
            || self.data.n_features() == 0
        {
            return idx;
        }

        let Some(best) = self.best_split(&samples, impurity) else {
            return idx;
        };

        self.importances[best.feature] += n as f64 * best.decrease;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|s| self.data.bin(best.feature, *s) <= best.bin);

        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[idx] = TreeNode::Split {
            feature: best.feature,
            threshold: self.data.threshold(best.feature, best.bin),
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, samples: &[usize], impurity: f64) -> Option<BestSplit> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let candidates = index::sample(&mut self.rng, self.data.n_features(), self.max_features);

        let mut best: Option<BestSplit> = None;
        for feature in candidates.iter() {
            let n_bins = self.data.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist = vec![vec![0usize; self.n_classes]; n_bins];
            for s in samples {
                hist[self.data.bin(feature, *s)][self.y[*s]] += 1;
            }

            let total: Vec<usize> = (0..self.n_classes)
                .map(|c| hist.iter().map(|h| h[c]).sum())
                .collect();
            let mut left = vec![0usize; self.n_classes];
            let mut n_left = 0usize;
            for (bin, h) in hist.iter().enumerate().take(n_bins - 1) {
                for c in 0..self.n_classes {
                    left[c] += h[c];
                }
                n_left += h.iter().sum::<usize>();
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                let decrease = impurity - weighted;
                if decrease > 1e-12 && best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    best = Some(BestSplit {
                        feature,
                        bin,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

fn leaf(counts: &[usize], n: usize) -> TreeNode {
    let n = n.max(1) as f64;
    TreeNode::Leaf {
        value: counts.iter().map(|c| *c as f64 / n).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n: usize) -> ForestParams {
        ForestParams {
            n_estimators: n,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i as f64 * 0.7).sin() * 0.3;
            x.push(vec![jitter, 1.0 + jitter]);
            y.push(0);
            x.push(vec![5.0 + jitter, 1.0 - jitter]);
            y.push(1);
            x.push(vec![10.0 + jitter, 1.0]);
            y.push(2);
        }
        (x, y)
    }

    #[test]
    fn test_separable_blobs() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(&x, &y, 3, &params(15), 42);
        assert_eq!(forest.n_trees(), 15);
        let p = forest.predict_proba(&[5.0, 1.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p[1] > 0.5);
        // column 0 carries all the signal
        let imp = forest.feature_importances();
        assert!(imp[0] > imp[1]);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs();
        let a = RandomForest::fit(&x, &y, 3, &params(8), 7);
        let b = RandomForest::fit(&x, &y, 3, &params(8), 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class() {
        let x = vec![vec![1.0], vec![2.0]];
        let forest = RandomForest::fit(&x, &[0, 0], 1, &params(3), 1);
        assert_eq!(forest.predict_proba(&[1.5]), vec![1.0]);
    }
}
