//! Stage artifacts and the versioned model set
//!
//! A [`StageArtifact`] bundles everything a stage needs at inference time.
//! A [`ModelSet`] is the immutable collection of stage artifacts that gets
//! published as a unit; it is never modified after publication.

use crate::ensemble::SoftVotingEnsemble;
use crate::evaluation::ModelPerformance;
use crate::preprocess::{preview, Preprocessor};
use crate::stage::{StageId, FRAME_PROBABILITY_PREFIX};
use chrono::{DateTime, Utc};
use framewise_core::{Error, FeatureVector, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label, confidence and full distribution for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePrediction {
    pub label: String,
    pub confidence: f64,
    /// Probability per class, in encoder order
    pub probabilities: Vec<(String, f64)>,
}

/// A ranked alternative to the top prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub label: String,
    pub probability: f64,
}

/// Frozen preprocessing, ensemble and evaluation of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageArtifact {
    pub stage: StageId,
    pub preprocessor: Preprocessor,
    pub ensemble: SoftVotingEnsemble,
    pub performance: ModelPerformance,
}

impl StageArtifact {
    /// Class labels, sorted
    pub fn classes(&self) -> &[String] {
        self.preprocessor.encoder().classes()
    }

    /// Probability per class for one feature map.
    ///
    /// Every feature the stage was trained on must be present. Missing
    /// `frame_system_prob_*` inputs mean the upstream stage was not run and
    /// give a not-ready error; any other gap is an input error.
    pub fn probabilities(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let missing = self.preprocessor.missing_features(features);
        if missing.iter().any(|name| name.starts_with(FRAME_PROBABILITY_PREFIX)) {
            return Err(Error::not_ready(
                self.stage.as_str(),
                "input lacks the frame_system probabilities; run the frame_system stage first",
            ));
        }
        if !missing.is_empty() {
            return Err(Error::input(format!(
                "{}: missing {} trained feature(s): {}",
                self.stage,
                missing.len(),
                preview(&missing)
            )));
        }
        Ok(self.ensemble.predict_proba(&self.preprocessor.transform_imputed(features)))
    }

    /// Most probable label with its probability as confidence
    pub fn predict(&self, features: &FeatureVector) -> Result<StagePrediction> {
        let probs = self.probabilities(features)?;
        let (best, confidence) = crate::ensemble::argmax(&probs);
        let classes = self.classes();
        let label = classes
            .get(best)
            .cloned()
            .ok_or_else(|| Error::internal(format!("{} stage has no classes", self.stage)))?;
        Ok(StagePrediction {
            label,
            confidence,
            probabilities: classes.iter().cloned().zip(probs).collect(),
        })
    }

    /// The `top_k` next most probable labels after the top prediction.
    ///
    /// Ordered by probability descending, ties by class order.
    pub fn predict_alternatives(&self, features: &FeatureVector, top_k: usize) -> Result<Vec<Alternative>> {
        Ok(rank_alternatives(self.classes(), &self.probabilities(features)?, top_k))
    }

    /// Probabilities with missing inputs imputed to 0, for training rows
    pub(crate) fn probabilities_imputed(&self, features: &FeatureVector) -> Vec<f64> {
        self.ensemble.predict_proba(&self.preprocessor.transform_imputed(features))
    }

    /// Structural consistency of an artifact read back from storage
    pub fn check(&self) -> Result<()> {
        let corrupt = |reason: String| Error::config(format!("{} artifact is corrupt: {reason}", self.stage));
        if self.classes().len() != self.ensemble.n_classes() {
            return Err(corrupt(format!(
                "{} classes but the ensemble predicts {}",
                self.classes().len(),
                self.ensemble.n_classes()
            )));
        }
        let n_inputs = self.preprocessor.feature_names().len();
        if let Some(bad) = self.preprocessor.selector().selected().iter().find(|i| **i >= n_inputs) {
            return Err(corrupt(format!("selected column {bad} is out of range ({n_inputs} inputs)")));
        }
        self.ensemble.check().map_err(corrupt)
    }

    /// Input feature names this stage expects
    pub fn input_features(&self) -> &[String] {
        self.preprocessor.feature_names()
    }
}

/// Rank classes by probability (stable on ties), skip the first, take `top_k`
pub fn rank_alternatives(classes: &[String], probs: &[f64], top_k: usize) -> Vec<Alternative> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|a, b| probs[*b].total_cmp(&probs[*a]).then(a.cmp(b)));
    order
        .into_iter()
        .skip(1)
        .take(top_k)
        .map(|i| Alternative {
            label: classes.get(i).cloned().unwrap_or_default(),
            probability: probs[i],
        })
        .collect()
}

/// Versioned, immutable set of stage artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub schema_version: u32,
    stages: BTreeMap<StageId, StageArtifact>,
}

impl ModelSet {
    pub fn new(trained_at: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            trained_at,
            schema_version: framewise_features::SCHEMA_VERSION,
            stages: BTreeMap::new(),
        }
    }

    pub fn insert_stage(&mut self, artifact: StageArtifact) {
        self.stages.insert(artifact.stage, artifact);
    }

    pub fn remove_stage(&mut self, stage: StageId) -> Option<StageArtifact> {
        self.stages.remove(&stage)
    }

    pub fn has_stage(&self, stage: StageId) -> bool {
        self.stages.contains_key(&stage)
    }

    /// Trained stages, in dependency order
    pub fn stages(&self) -> impl Iterator<Item = &StageArtifact> {
        StageId::TRAINING_ORDER
            .into_iter()
            .filter_map(|s| self.stages.get(&s))
    }

    /// Artifact of a stage whose dependencies are also trained
    pub fn stage(&self, stage: StageId) -> Result<&StageArtifact> {
        for dep in stage.dependencies() {
            if !self.stages.contains_key(dep) {
                return Err(Error::not_ready(
                    stage.as_str(),
                    format!("depends on stage '{dep}' which is not trained"),
                ));
            }
        }
        self.stages
            .get(&stage)
            .ok_or_else(|| Error::not_ready(stage.as_str(), "stage is not trained"))
    }
}
