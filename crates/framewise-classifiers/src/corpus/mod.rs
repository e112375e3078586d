//! Labeled training rows for every stage

mod samples;

pub use samples::{SampleCorpus, SampleKind};

use crate::stage::StageId;
use framewise_core::{FeatureVector, StructuralModel};
use framewise_features::{extract_global_features, extract_model_member_features};
use serde::{Deserialize, Serialize};

/// Feature rows paired with string labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledRows {
    pub rows: Vec<FeatureVector>,
    pub labels: Vec<String>,
}

impl LabeledRows {
    pub fn push(&mut self, row: FeatureVector, label: impl Into<String>) {
        self.rows.push(row);
        self.labels.push(label.into());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extend(&mut self, other: LabeledRows) {
        self.rows.extend(other.rows);
        self.labels.extend(other.labels);
    }
}

/// Training rows for the three stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingCorpus {
    pub member_role: LabeledRows,
    pub frame_system: LabeledRows,
    pub building_type: LabeledRows,
}

impl TrainingCorpus {
    /// Extract rows from labeled models.
    ///
    /// Models contribute a building-level row per ground-truth label they
    /// carry, and one member-level row per member with a role. Rows that
    /// cannot be extracted are skipped.
    pub fn from_models(models: &[StructuralModel]) -> Self {
        let mut corpus = Self::default();
        for model in models {
            corpus.add_model(model);
        }
        tracing::debug!(
            models = models.len(),
            members = corpus.member_role.len(),
            buildings = corpus.building_type.len(),
            "extracted training corpus"
        );
        corpus
    }

    pub fn add_model(&mut self, model: &StructuralModel) {
        let global = extract_global_features(model);
        if !global.is_empty() {
            if let Some(label) = &model.frame_system {
                self.frame_system.push(global.clone(), label.clone());
            }
            if let Some(label) = &model.building_type {
                self.building_type.push(global, label.clone());
            }
        }

        let per_member = extract_model_member_features(model);
        for member in &model.members {
            let (Some(role), Some(features)) = (&member.role, per_member.get(&member.id)) else {
                continue;
            };
            self.member_role.push(features.clone(), role.clone());
        }
    }

    pub fn rows(&self, stage: StageId) -> &LabeledRows {
        match stage {
            StageId::MemberRole => &self.member_role,
            StageId::FrameSystem => &self.frame_system,
            StageId::BuildingType => &self.building_type,
        }
    }

    pub fn rows_mut(&mut self, stage: StageId) -> &mut LabeledRows {
        match stage {
            StageId::MemberRole => &mut self.member_role,
            StageId::FrameSystem => &mut self.frame_system,
            StageId::BuildingType => &mut self.building_type,
        }
    }

    pub fn extend(&mut self, other: TrainingCorpus) {
        self.member_role.extend(other.member_role);
        self.frame_system.extend(other.frame_system);
        self.building_type.extend(other.building_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewise_core::{Member, Node};

    #[test]
    fn test_from_models_uses_labels() {
        let mut model = StructuralModel::new("m");
        model.nodes = vec![Node::new("a", 0.0, 0.0, 0.0), Node::new("b", 0.0, 0.0, 4.0)];
        model.members = vec![
            Member::new("c", "a", "b").with_role("Column"),
            Member::new("u", "a", "b"),
            Member::new("x", "a", "ghost").with_role("Beam"),
        ];
        model.frame_system = Some("MOMENT".into());

        let corpus = TrainingCorpus::from_models(&[model]);
        assert_eq!(corpus.member_role.labels, vec!["Column"]);
        assert_eq!(corpus.frame_system.labels, vec!["MOMENT"]);
        assert!(corpus.building_type.is_empty());
    }
}
