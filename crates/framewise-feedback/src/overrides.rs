//! Override store
//!
//! Bounded, thread-safe store of user corrections. Records stay unprocessed
//! until a retraining run that used them publishes its model. When the store
//! is full the oldest processed record is evicted first.

use crate::config::FeedbackConfig;
use chrono::{DateTime, Utc};
use framewise_classifiers::StageId;
use framewise_core::{Geometry, Member, Node, Result, StructuralModel};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the user corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionType {
    BuildingType,
    MemberTag,
    FrameDefinition,
    Geometry,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildingType => "BUILDING_TYPE",
            Self::MemberTag => "MEMBER_TAG",
            Self::FrameDefinition => "FRAME_DEFINITION",
            Self::Geometry => "GEOMETRY",
        }
    }

    /// Stage a correction of this type can train
    pub fn target_stage(&self) -> Option<StageId> {
        match self {
            Self::BuildingType => Some(StageId::BuildingType),
            Self::FrameDefinition => Some(StageId::FrameSystem),
            Self::MemberTag => Some(StageId::MemberRole),
            Self::Geometry => None,
        }
    }

    /// Keys of an object-shaped correction that hold the corrected label
    fn label_keys(&self) -> &'static [&'static str] {
        match self {
            Self::BuildingType => &["buildingType", "building_type", "label", "value"],
            Self::FrameDefinition => &["frameSystem", "frame_system", "label", "value"],
            Self::MemberTag => &["tag", "role", "memberTag", "label", "value"],
            Self::Geometry => &[],
        }
    }
}

impl std::fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural snapshot submitted with an override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelContext {
    pub nodes: Vec<Node>,
    pub members: Vec<Member>,
    pub geometry: Option<Geometry>,
    /// The corrected member, for member-tag overrides
    pub member_id: Option<String>,
}

impl ModelContext {
    pub fn from_model(model: &StructuralModel) -> Self {
        Self {
            nodes: model.nodes.clone(),
            members: model.members.clone(),
            geometry: model.geometry.clone(),
            member_id: None,
        }
    }

    pub fn with_member(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.members.is_empty()
    }

    pub fn to_model(&self, id: impl Into<String>) -> StructuralModel {
        let mut model = StructuralModel::new(id);
        model.nodes = self.nodes.clone();
        model.members = self.members.clone();
        model.geometry = self.geometry.clone();
        model
    }

    /// The member a member-tag override refers to
    pub fn member(&self) -> Option<&Member> {
        let id = self.member_id.as_deref()?;
        self.members.iter().find(|m| m.id == id)
    }
}

/// Heuristic value of an override for future training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningImpact {
    /// Can become a training row for a classification stage
    High,
    /// Has context but corrects geometry, which no stage learns
    Medium,
    /// Cannot contribute a training row
    Low,
}

/// Override as submitted by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub prediction_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub correction_type: CorrectionType,
    #[serde(default)]
    pub original_prediction: Value,
    pub user_correction: Value,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub model_context: Option<ModelContext>,
}

impl OverrideRequest {
    pub fn new(prediction_id: impl Into<String>, correction_type: CorrectionType, user_correction: impl Into<Value>) -> Self {
        Self {
            prediction_id: prediction_id.into(),
            user_id: None,
            project_id: None,
            correction_type,
            original_prediction: Value::Null,
            user_correction: user_correction.into(),
            reasoning: None,
            model_context: None,
        }
    }

    pub fn with_original(mut self, original: impl Into<Value>) -> Self {
        self.original_prediction = original.into();
        self
    }

    pub fn with_context(mut self, context: ModelContext) -> Self {
        self.model_context = Some(context);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.project_id = Some(project_id.into());
        self
    }
}

/// Stored override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub prediction_id: String,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub correction_type: CorrectionType,
    pub original_prediction: Value,
    pub user_correction: Value,
    pub reasoning: Option<String>,
    pub model_context: Option<ModelContext>,
    pub learning_impact: LearningImpact,
    pub processed: bool,
}

impl OverrideRecord {
    fn from_request(request: OverrideRequest) -> Self {
        let mut record = Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            prediction_id: request.prediction_id,
            user_id: request.user_id,
            project_id: request.project_id,
            correction_type: request.correction_type,
            original_prediction: request.original_prediction,
            user_correction: request.user_correction,
            reasoning: request.reasoning,
            model_context: request.model_context,
            learning_impact: LearningImpact::Low,
            processed: false,
        };
        record.learning_impact = record.assess_impact();
        record
    }

    /// The corrected label: a plain string, or a string under a known key
    pub fn corrected_label(&self) -> Option<String> {
        let label = match &self.user_correction {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => self
                .correction_type
                .label_keys()
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str)),
            _ => None,
        }?;
        let label = label.trim();
        (!label.is_empty()).then(|| label.to_string())
    }

    /// Context that is present and non-empty
    pub fn context(&self) -> Option<&ModelContext> {
        self.model_context.as_ref().filter(|c| !c.is_empty())
    }

    /// Stage this record can contribute a row to, if any
    pub fn trainable_stage(&self) -> Option<StageId> {
        let stage = self.correction_type.target_stage()?;
        let context = self.context()?;
        self.corrected_label()?;
        if stage == StageId::MemberRole {
            context.member()?;
        }
        Some(stage)
    }

    pub fn assess_impact(&self) -> LearningImpact {
        if self.trainable_stage().is_some() {
            LearningImpact::High
        } else if self.correction_type == CorrectionType::Geometry && self.context().is_some() {
            LearningImpact::Medium
        } else {
            LearningImpact::Low
        }
    }
}

/// Answer to an override submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideReceipt {
    pub override_id: Uuid,
    pub learning_impact: LearningImpact,
    pub unprocessed_count: usize,
    pub ready_for_retraining: bool,
}

/// Bounded store of override records
pub struct OverrideStore {
    config: FeedbackConfig,
    records: RwLock<VecDeque<OverrideRecord>>,
}

impl OverrideStore {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            records: RwLock::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Store an override and annotate its learning impact
    pub fn submit(&self, request: OverrideRequest) -> OverrideReceipt {
        let record = OverrideRecord::from_request(request);
        let receipt_id = record.id;
        let learning_impact = record.learning_impact;
        let correction_type = record.correction_type;

        let mut records = self.records.write();
        records.push_back(record);
        self.evict(&mut records);
        let unprocessed_count = records.iter().filter(|r| !r.processed).count();
        drop(records);

        metrics::counter!("framewise_overrides_total", "correction_type" => correction_type.as_str())
            .increment(1);
        info!(
            id = %receipt_id,
            %correction_type,
            impact = ?learning_impact,
            unprocessed = unprocessed_count,
            "recorded override"
        );

        OverrideReceipt {
            override_id: receipt_id,
            learning_impact,
            unprocessed_count,
            ready_for_retraining: unprocessed_count >= self.config.retrain_threshold,
        }
    }

    fn evict(&self, records: &mut VecDeque<OverrideRecord>) {
        while records.len() > self.config.capacity {
            let index = records.iter().position(|r| r.processed).unwrap_or(0);
            if let Some(evicted) = records.remove(index) {
                if evicted.processed {
                    debug!(id = %evicted.id, "evicted processed override");
                } else {
                    warn!(id = %evicted.id, "override store full; evicted unprocessed override");
                }
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<OverrideRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record, oldest first
    pub fn records(&self) -> Vec<OverrideRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Copy of the unprocessed records, oldest first
    pub fn unprocessed(&self) -> Vec<OverrideRecord> {
        self.records.read().iter().filter(|r| !r.processed).cloned().collect()
    }

    pub fn unprocessed_count(&self) -> usize {
        self.records.read().iter().filter(|r| !r.processed).count()
    }

    pub fn ready_for_retraining(&self) -> bool {
        self.unprocessed_count() >= self.config.retrain_threshold
    }

    /// Mark records processed; returns how many changed
    pub fn mark_processed(&self, ids: &[Uuid]) -> usize {
        let ids: HashSet<&Uuid> = ids.iter().collect();
        let mut changed = 0;
        for record in self.records.write().iter_mut() {
            if !record.processed && ids.contains(&record.id) {
                record.processed = true;
                changed += 1;
            }
        }
        changed
    }

    /// Write all records as a JSON array
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let records = self.records();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&records)?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), records = records.len(), "saved overrides");
        Ok(())
    }

    /// Load a store saved with [`save`](Self::save); a missing file gives an empty store
    pub fn load(path: impl AsRef<Path>, config: FeedbackConfig) -> Result<Self> {
        let store = Self::new(config);
        let bytes = match std::fs::read(path.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<OverrideRecord> = serde_json::from_slice(&bytes)?;
        {
            let mut held = store.records.write();
            held.extend(records);
            store.evict(&mut held);
        }
        info!(path = %path.as_ref().display(), records = store.len(), "loaded overrides");
        Ok(store)
    }
}

impl Default for OverrideStore {
    fn default() -> Self {
        Self::new(FeedbackConfig::default())
    }
}
