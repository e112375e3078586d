//! Classifier stages and their dependency graph

use framewise_features::FeatureSchema;
use serde::{Deserialize, Serialize};

/// Prefix of the features the frame-system stage contributes to building-type input
pub const FRAME_PROBABILITY_PREFIX: &str = "frame_system_prob_";

/// One classification target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    MemberRole,
    FrameSystem,
    BuildingType,
}

impl StageId {
    /// Topological order: every stage comes after the stages it depends on
    pub const TRAINING_ORDER: [StageId; 3] =
        [StageId::MemberRole, StageId::FrameSystem, StageId::BuildingType];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemberRole => "member_role",
            Self::FrameSystem => "frame_system",
            Self::BuildingType => "building_type",
        }
    }

    /// Feature extractor this stage consumes
    pub fn schema(&self) -> FeatureSchema {
        match self {
            Self::MemberRole => FeatureSchema::Member,
            Self::FrameSystem | Self::BuildingType => FeatureSchema::Global,
        }
    }

    /// Stages whose output this stage consumes
    pub fn dependencies(&self) -> &'static [StageId] {
        match self {
            Self::BuildingType => &[StageId::FrameSystem],
            Self::MemberRole | Self::FrameSystem => &[],
        }
    }

    /// `stages` plus every stage that consumes one of them, in training order
    pub fn with_dependents(stages: &[StageId]) -> Vec<StageId> {
        let mut expanded = Vec::new();
        for stage in Self::TRAINING_ORDER {
            if stages.contains(&stage) || stage.dependencies().iter().any(|d| expanded.contains(d)) {
                expanded.push(stage);
            }
        }
        expanded
    }

    /// Parse the snake_case name
    pub fn parse(name: &str) -> Option<Self> {
        Self::TRAINING_ORDER.into_iter().find(|s| s.as_str() == name)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_order_respects_dependencies() {
        for (i, stage) in StageId::TRAINING_ORDER.iter().enumerate() {
            for dep in stage.dependencies() {
                let pos = StageId::TRAINING_ORDER.iter().position(|s| s == dep).unwrap();
                assert!(pos < i, "{dep} must train before {stage}");
            }
        }
    }

    #[test]
    fn test_with_dependents() {
        assert_eq!(
            StageId::with_dependents(&[StageId::FrameSystem]),
            vec![StageId::FrameSystem, StageId::BuildingType]
        );
        assert_eq!(StageId::with_dependents(&[StageId::MemberRole]), vec![StageId::MemberRole]);
        assert_eq!(
            StageId::with_dependents(&[StageId::BuildingType, StageId::MemberRole]),
            vec![StageId::MemberRole, StageId::BuildingType]
        );
        assert!(StageId::with_dependents(&[]).is_empty());
    }

    #[test]
    fn test_parse_roundtrip() {
        for stage in StageId::TRAINING_ORDER {
            assert_eq!(StageId::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(StageId::parse("diaphragm"), None);
    }
}
