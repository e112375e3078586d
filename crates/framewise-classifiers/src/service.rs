//! Prediction service
//!
//! Stateless entry points over the live model set. Every call validates the
//! model, takes one snapshot of the published set, and runs all stages
//! against that snapshot, so a concurrent swap never mixes two versions in
//! one response.

use crate::artifact::{rank_alternatives, Alternative, ModelSet, StageArtifact};
use crate::cascade::augment_with_frame_probabilities;
use crate::ensemble::argmax;
use crate::evaluation::ModelPerformance;
use crate::reasoning::building_reasons;
use crate::registry::LiveModel;
use crate::seismic::SeismicParameters;
use crate::stage::StageId;
use chrono::{DateTime, Utc};
use framewise_core::{Error, FeatureVector, IntegrityValidator, ModelValidator, Result, StructuralModel};
use framewise_features::{extract_global_features, extract_model_member_features, HeightClass};
use framewise_telemetry::PredictionMonitor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Importance entries listed per stage in [`ModelInfo`]
pub const STAGE_INFO_IMPORTANCE: usize = 10;

/// Building-level classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingClassification {
    pub building_type: String,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
    pub frame_system: String,
    pub frame_confidence: f64,
    pub height_class: HeightClass,
    pub seismic: Option<SeismicParameters>,
    pub reasoning: Vec<String>,
    /// Building-level features the prediction was made from
    pub features: FeatureVector,
    /// Non-blocking validation findings
    pub warnings: Vec<String>,
    pub model_version: u64,
}

/// Per-member role classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberClassification {
    pub tags: BTreeMap<String, String>,
    pub confidences: BTreeMap<String, f64>,
    pub features: BTreeMap<String, FeatureVector>,
    /// Requested members that produced no features
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
    pub model_version: u64,
}

/// What one trained stage predicts and from which inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInfo {
    pub stage: StageId,
    pub classes: Vec<String>,
    pub input_features: Vec<String>,
    pub selected_features: Vec<String>,
    pub accuracy: f64,
    pub f1_weighted: f64,
    pub cv_mean: f64,
    pub cv_std: f64,
    /// Most important selected features, descending
    pub feature_importance: Vec<(String, f64)>,
}

impl StageInfo {
    fn from_artifact(artifact: &StageArtifact) -> Self {
        let ModelPerformance {
            accuracy,
            f1_weighted,
            cv_mean,
            cv_std,
            ref feature_importance,
            ..
        } = artifact.performance;
        Self {
            stage: artifact.stage,
            classes: artifact.classes().to_vec(),
            input_features: artifact.input_features().to_vec(),
            selected_features: artifact
                .preprocessor
                .selected_features()
                .into_iter()
                .map(str::to_string)
                .collect(),
            accuracy,
            f1_weighted,
            cv_mean,
            cv_std,
            feature_importance: feature_importance
                .iter()
                .take(STAGE_INFO_IMPORTANCE)
                .cloned()
                .collect(),
        }
    }
}

/// Building and member results computed against one model snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClassification {
    pub building: BuildingClassification,
    pub members: MemberClassification,
}

/// Summary of the published model set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub schema_version: u32,
    pub stages: Vec<StageInfo>,
}

/// Classification entry points over a [`LiveModel`]
pub struct ClassificationService {
    live: Arc<LiveModel>,
    validator: Arc<dyn ModelValidator>,
    monitor: Option<Arc<PredictionMonitor>>,
    alternatives_top_k: usize,
}

impl ClassificationService {
    pub fn new(live: Arc<LiveModel>) -> Self {
        Self {
            live,
            validator: Arc::new(IntegrityValidator::new()),
            monitor: None,
            alternatives_top_k: 3,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ModelValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<PredictionMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_alternatives_top_k(mut self, top_k: usize) -> Self {
        self.alternatives_top_k = top_k;
        self
    }

    pub fn live(&self) -> &Arc<LiveModel> {
        &self.live
    }

    pub fn monitor(&self) -> Option<&Arc<PredictionMonitor>> {
        self.monitor.as_ref()
    }

    fn validate(&self, model: &StructuralModel) -> Result<Vec<String>> {
        let outcome = self.validator.validate(model);
        if !outcome.is_valid {
            debug!(
                validator = self.validator.name(),
                model = %model.id,
                errors = outcome.errors.len(),
                "model rejected by validator"
            );
        }
        outcome.into_result()
    }

    fn snapshot(&self, stage: StageId) -> Result<Arc<ModelSet>> {
        self.live
            .current()
            .ok_or_else(|| Error::not_ready(stage.as_str(), "no trained model is loaded"))
    }

    fn log(&self, stage: StageId, features: &FeatureVector, label: &str, confidence: f64) {
        if let Some(monitor) = &self.monitor {
            monitor.log(stage.as_str(), features, label, confidence, None);
        }
    }

    fn record_latency(stage: StageId, count: u64, started: Instant) {
        metrics::counter!("framewise_predictions_total", "stage" => stage.as_str()).increment(count);
        metrics::histogram!("framewise_prediction_latency_us", "stage" => stage.as_str())
            .record(started.elapsed().as_micros() as f64);
    }

    /// Classify the building type (and frame system) of a model
    pub fn classify_building(&self, model: &StructuralModel) -> Result<BuildingClassification> {
        let warnings = self.validate(model)?;
        let set = self.snapshot(StageId::BuildingType)?;
        self.building_from(&set, model, warnings)
    }

    /// Classify the structural role of members.
    ///
    /// With `member_ids`, only those members are classified. Members that
    /// yield no features (dangling node references, unknown ids) are
    /// reported in `skipped` and left out of the result.
    pub fn classify_members(
        &self,
        model: &StructuralModel,
        member_ids: Option<&[String]>,
    ) -> Result<MemberClassification> {
        let warnings = self.validate(model)?;
        let set = self.snapshot(StageId::MemberRole)?;
        self.members_from(&set, model, member_ids, warnings)
    }

    /// Classify the building and every member in one pass.
    ///
    /// The model is validated once and both results come from the same
    /// published set, so they always carry the same `model_version`.
    pub fn classify_model(&self, model: &StructuralModel) -> Result<ModelClassification> {
        let warnings = self.validate(model)?;
        let set = self.snapshot(StageId::BuildingType)?;
        set.stage(StageId::MemberRole)?;
        let building = self.building_from(&set, model, warnings.clone())?;
        let members = self.members_from(&set, model, None, warnings)?;
        Ok(ModelClassification { building, members })
    }

    fn building_from(
        &self,
        set: &ModelSet,
        model: &StructuralModel,
        warnings: Vec<String>,
    ) -> Result<BuildingClassification> {
        let started = Instant::now();
        let building = set.stage(StageId::BuildingType)?;
        let frame = set.stage(StageId::FrameSystem)?;

        let features = extract_global_features(model);
        if features.is_empty() {
            metrics::counter!("framewise_extraction_gaps_total").increment(1);
            return Err(Error::input(format!(
                "no building-level features could be extracted from model '{}'",
                model.id
            )));
        }

        let frame_prediction = frame.predict(&features)?;
        let augmented = augment_with_frame_probabilities(&features, frame)?;
        let probabilities = building.probabilities(&augmented)?;
        let (best, confidence) = argmax(&probabilities);
        let building_type = building
            .classes()
            .get(best)
            .cloned()
            .ok_or_else(|| Error::internal("building_type stage has no classes"))?;
        let alternatives = rank_alternatives(building.classes(), &probabilities, self.alternatives_top_k);

        let height = features.get("building_height").copied().unwrap_or(0.0);
        let classification = BuildingClassification {
            confidence,
            alternatives,
            frame_confidence: frame_prediction.confidence,
            height_class: HeightClass::from_height(height),
            seismic: SeismicParameters::for_frame_system(&frame_prediction.label),
            reasoning: building_reasons(&features, &building.performance.feature_importance),
            warnings,
            model_version: set.version,
            building_type,
            frame_system: frame_prediction.label,
            features,
        };

        self.log(
            StageId::FrameSystem,
            &classification.features,
            &classification.frame_system,
            classification.frame_confidence,
        );
        self.log(
            StageId::BuildingType,
            &augmented,
            &classification.building_type,
            classification.confidence,
        );
        Self::record_latency(StageId::BuildingType, 1, started);
        debug!(
            model = %model.id,
            building_type = %classification.building_type,
            confidence = classification.confidence,
            frame_system = %classification.frame_system,
            "classified building"
        );
        Ok(classification)
    }

    fn members_from(
        &self,
        set: &ModelSet,
        model: &StructuralModel,
        member_ids: Option<&[String]>,
        warnings: Vec<String>,
    ) -> Result<MemberClassification> {
        let started = Instant::now();
        let stage = set.stage(StageId::MemberRole)?;

        let requested: Vec<&str> = match member_ids {
            Some(ids) => {
                let mut seen = HashSet::new();
                ids.iter().map(String::as_str).filter(|id| seen.insert(*id)).collect()
            }
            None => model.members.iter().map(|m| m.id.as_str()).collect(),
        };

        let mut per_member = extract_model_member_features(model);
        let mut result = MemberClassification {
            warnings,
            model_version: set.version,
            ..MemberClassification::default()
        };

        for id in requested {
            let Some(features) = per_member.remove(id) else {
                result.skipped.push(id.to_string());
                continue;
            };
            let prediction = stage.predict(&features)?;
            self.log(StageId::MemberRole, &features, &prediction.label, prediction.confidence);
            result.tags.insert(id.to_string(), prediction.label);
            result.confidences.insert(id.to_string(), prediction.confidence);
            result.features.insert(id.to_string(), features);
        }

        if !result.skipped.is_empty() {
            metrics::counter!("framewise_extraction_gaps_total").increment(result.skipped.len() as u64);
            warn!(
                model = %model.id,
                skipped = result.skipped.len(),
                "members without extractable features were left out"
            );
        }
        Self::record_latency(StageId::MemberRole, result.tags.len() as u64, started);
        Ok(result)
    }

    /// Selected features of a stage ranked by forest importance, descending
    pub fn feature_importance(&self, stage: StageId) -> Result<Vec<(String, f64)>> {
        let set = self.snapshot(stage)?;
        Ok(set.stage(stage)?.performance.feature_importance.clone())
    }

    /// Classes, features and evaluation of every trained stage
    pub fn model_info(&self) -> Result<ModelInfo> {
        let set = self
            .live
            .current()
            .ok_or_else(|| Error::not_ready("model", "no trained model is loaded"))?;
        Ok(ModelInfo {
            version: set.version,
            trained_at: set.trained_at,
            schema_version: set.schema_version,
            stages: set.stages().map(StageInfo::from_artifact).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewise_core::{Member, Node, Restraints};

    fn portal() -> StructuralModel {
        let mut model = StructuralModel::new("portal");
        model.nodes = vec![
            Node::new("n1", 0.0, 0.0, 0.0).with_restraints(Restraints::fixed()),
            Node::new("n2", 0.0, 0.0, 5.0),
        ];
        model.members = vec![Member::new("c1", "n1", "n2").with_type("COLUMN")];
        model
    }

    #[test]
    fn test_not_ready_without_model() {
        let service = ClassificationService::new(Arc::new(LiveModel::new()));
        let err = service.classify_building(&portal()).unwrap_err();
        assert!(err.is_not_ready());
        assert!(service.classify_members(&portal(), None).unwrap_err().is_not_ready());
        assert!(service.model_info().unwrap_err().is_not_ready());
    }

    #[test]
    fn test_invalid_model_rejected_before_readiness() {
        let service = ClassificationService::new(Arc::new(LiveModel::new()));
        let err = service
            .classify_building(&StructuralModel::new("empty"))
            .unwrap_err();
        assert!(err.is_input_error());
    }
}
