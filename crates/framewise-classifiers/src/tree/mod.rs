//! Tree learners for the ensemble members
//!
//! Both learners train on quantile-binned features and emit plain
//! threshold trees, so inference works on raw (scaled) values.

mod binning;
mod boosting;
mod forest;

pub use binning::BinnedMatrix;
pub use boosting::{GradientBoosting, GrowthPolicy};
pub use forest::RandomForest;

use serde::{Deserialize, Serialize};

/// Node of a binary threshold tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// `row[feature] <= threshold` descends left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution (forest) or single raw score (boosting)
    Leaf { value: Vec<f64> },
}

/// Arena-allocated decision tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub(crate) fn from_nodes(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Leaf value reached by a row.
    ///
    /// Children always point forward in the arena; a node that does not
    /// yields an empty value instead of looping.
    pub fn evaluate(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        while let Some(node) = self.nodes.get(idx) {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    let next = if v <= *threshold { *left } else { *right };
                    if next <= idx {
                        break;
                    }
                    idx = next;
                }
                TreeNode::Leaf { value } => return value,
            }
        }
        &[]
    }

    /// Structural check for a tree read back from storage: children point
    /// strictly forward and inside the arena, leaves hold `leaf_len` values.
    pub fn check(&self, leaf_len: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { left, right, .. } => {
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} points to invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } if value.len() != leaf_len => {
                    return Err(format!(
                        "leaf {i} holds {} values, expected {leaf_len}",
                        value.len()
                    ));
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_follows_threshold() {
        let tree = DecisionTree::from_nodes(vec![
            TreeNode::Split {
                feature: 1,
                threshold: 2.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: vec![1.0, 0.0] },
            TreeNode::Leaf { value: vec![0.0, 1.0] },
        ]);
        assert_eq!(tree.evaluate(&[9.0, 2.0]), &[1.0, 0.0]);
        assert_eq!(tree.evaluate(&[9.0, 2.5]), &[0.0, 1.0]);
        assert_eq!(tree.leaf_count(), 2);
        assert!(tree.check(2).is_ok());
    }

    #[test]
    fn test_corrupt_tree_rejected_and_never_panics() {
        let dangling = DecisionTree::from_nodes(vec![TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            left: 1,
            right: 7,
        }]);
        assert!(dangling.check(2).unwrap_err().contains("invalid child"));
        assert!(dangling.evaluate(&[0.0]).is_empty());
        assert!(dangling.evaluate(&[5.0]).is_empty());

        let cyclic = DecisionTree::from_nodes(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf { value: vec![1.0] },
        ]);
        assert!(cyclic.check(1).is_err());
        assert!(cyclic.evaluate(&[0.0]).is_empty());
        assert_eq!(cyclic.evaluate(&[2.0]), &[1.0]);

        let short_leaf = DecisionTree::from_nodes(vec![TreeNode::Leaf { value: vec![1.0] }]);
        assert!(short_leaf.check(3).unwrap_err().contains("expected 3"));
        assert!(DecisionTree::from_nodes(Vec::new()).check(1).is_err());
    }
}
