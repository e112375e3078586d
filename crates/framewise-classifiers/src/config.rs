//! Configuration for classifier stages and the training pipeline

use crate::stage::StageId;
use framewise_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the whole classifier cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Member-role stage
    #[serde(default = "StageConfig::member_default")]
    pub member_role: StageConfig,

    /// Frame-system stage
    #[serde(default = "StageConfig::global_default")]
    pub frame_system: StageConfig,

    /// Building-type stage
    #[serde(default = "StageConfig::global_default")]
    pub building_type: StageConfig,

    /// Hold-out and cross-validation settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Number of alternatives returned after the top prediction
    #[serde(default = "default_alternatives_top_k")]
    pub alternatives_top_k: usize,
}

/// Per-stage preprocessing and ensemble settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Number of features kept by univariate selection
    pub top_k_features: usize,

    /// Bagging member
    pub forest: ForestParams,

    /// Depth-wise boosting member
    pub depthwise: BoostingParams,

    /// Leaf-wise boosting member
    pub leafwise: BoostingParams,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Leaf budget; set for leaf-wise growth only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_leaves: Option<usize>,
    #[serde(default = "default_subsample")]
    pub subsample: f64,
    #[serde(default = "default_subsample")]
    pub colsample: f64,
}

/// Evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Fraction of rows held out for the test split
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Stratified cross-validation folds on the training partition
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    /// Seed for splits, bootstraps and subsampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            cv_folds: default_cv_folds(),
            seed: default_seed(),
        }
    }
}

impl StageConfig {
    /// Defaults for the member-level stage
    pub fn member_default() -> Self {
        Self {
            top_k_features: 30,
            forest: ForestParams {
                n_estimators: 200,
                max_depth: 15,
                min_samples_split: 3,
                min_samples_leaf: 1,
            },
            depthwise: BoostingParams {
                n_estimators: 200,
                learning_rate: 0.1,
                max_depth: 8,
                num_leaves: None,
                subsample: 0.8,
                colsample: 0.8,
            },
            leafwise: BoostingParams {
                n_estimators: 200,
                learning_rate: 0.1,
                max_depth: 8,
                num_leaves: Some(31),
                subsample: 0.8,
                colsample: 0.8,
            },
        }
    }

    /// Defaults for the building-level stages
    pub fn global_default() -> Self {
        Self {
            top_k_features: 25,
            forest: ForestParams {
                n_estimators: 150,
                max_depth: 12,
                min_samples_split: 2,
                min_samples_leaf: 1,
            },
            depthwise: BoostingParams {
                n_estimators: 150,
                learning_rate: 0.1,
                max_depth: 6,
                num_leaves: None,
                subsample: 0.8,
                colsample: 0.8,
            },
            leafwise: BoostingParams {
                n_estimators: 150,
                learning_rate: 0.1,
                max_depth: 6,
                num_leaves: Some(31),
                subsample: 0.8,
                colsample: 0.8,
            },
        }
    }

    /// Scale every ensemble member down to `n_estimators` trees
    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.forest.n_estimators = n_estimators;
        self.depthwise.n_estimators = n_estimators;
        self.leafwise.n_estimators = n_estimators;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            member_role: StageConfig::member_default(),
            frame_system: StageConfig::global_default(),
            building_type: StageConfig::global_default(),
            evaluation: EvaluationConfig::default(),
            alternatives_top_k: default_alternatives_top_k(),
        }
    }
}

impl ClassifierConfig {
    /// Small ensembles for tests and smoke runs
    pub fn quick() -> Self {
        Self {
            member_role: StageConfig::member_default().with_estimators(10),
            frame_system: StageConfig::global_default().with_estimators(10),
            building_type: StageConfig::global_default().with_estimators(10),
            evaluation: EvaluationConfig {
                cv_folds: 3,
                ..EvaluationConfig::default()
            },
            alternatives_top_k: default_alternatives_top_k(),
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse classifier config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Settings of one stage
    pub fn stage(&self, stage: StageId) -> &StageConfig {
        match stage {
            StageId::MemberRole => &self.member_role,
            StageId::FrameSystem => &self.frame_system,
            StageId::BuildingType => &self.building_type,
        }
    }

    /// Reject settings that would make training meaningless
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.evaluation.test_size) {
            return Err(Error::config("evaluation.test_size must be in [0, 1)"));
        }
        for stage in StageId::TRAINING_ORDER {
            let cfg = self.stage(stage);
            if cfg.top_k_features == 0 {
                return Err(Error::config(format!("{stage}: top_k_features must be positive")));
            }
            if cfg.forest.n_estimators == 0
                || cfg.depthwise.n_estimators == 0
                || cfg.leafwise.n_estimators == 0
            {
                return Err(Error::config(format!("{stage}: every ensemble member needs trees")));
            }
            for p in [&cfg.depthwise, &cfg.leafwise] {
                if !(p.subsample > 0.0 && p.subsample <= 1.0 && p.colsample > 0.0 && p.colsample <= 1.0) {
                    return Err(Error::config(format!("{stage}: subsample ratios must be in (0, 1]")));
                }
            }
        }
        Ok(())
    }
}

fn default_alternatives_top_k() -> usize {
    3
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_subsample() -> f64 {
    0.8
}

fn default_test_size() -> f64 {
    0.2
}

fn default_cv_folds() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.member_role.top_k_features, 30);
        assert_eq!(config.building_type.top_k_features, 25);
        assert_eq!(config.member_role.forest.n_estimators, 200);
        assert_eq!(config.frame_system.depthwise.max_depth, 6);
        assert_eq!(config.member_role.leafwise.num_leaves, Some(31));
        assert_eq!(config.evaluation.cv_folds, 5);
        assert_eq!(config.evaluation.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
alternatives_top_k: 2
evaluation:
  cv_folds: 3
"#;
        let config = ClassifierConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.alternatives_top_k, 2);
        assert_eq!(config.evaluation.cv_folds, 3);
        assert_eq!(config.evaluation.test_size, 0.2);
        assert_eq!(config.member_role, StageConfig::member_default());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let yaml = "evaluation:\n  test_size: 1.5\n";
        assert!(ClassifierConfig::from_yaml(yaml).is_err());
    }
}
