//! Training rows from overrides
//!
//! Each usable override is re-run through the same feature extractors used
//! for the base corpus, labeled with the user's correction.

use crate::overrides::OverrideRecord;
use framewise_classifiers::{StageId, TrainingCorpus};
use framewise_features::{extract_global_features, extract_member_features};
use tracing::debug;
use uuid::Uuid;

/// Rows synthesized from a batch of overrides
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub corpus: TrainingCorpus,
    /// Overrides that produced a row
    pub used: Vec<Uuid>,
    /// Overrides that could not, with the reason
    pub skipped: Vec<(Uuid, String)>,
}

impl Synthesis {
    pub fn rows(&self) -> usize {
        self.corpus.member_role.len() + self.corpus.frame_system.len() + self.corpus.building_type.len()
    }
}

/// Synthesize one labeled row per usable override
pub fn synthesize_rows(records: &[OverrideRecord]) -> Synthesis {
    let mut synthesis = Synthesis::default();

    for record in records {
        match synthesize_one(record, &mut synthesis.corpus) {
            Ok(stage) => {
                debug!(id = %record.id, %stage, "synthesized override row");
                synthesis.used.push(record.id);
            }
            Err(reason) => {
                debug!(id = %record.id, correction_type = %record.correction_type, reason, "skipped override");
                synthesis.skipped.push((record.id, reason.to_string()));
            }
        }
    }
    synthesis
}

fn synthesize_one(record: &OverrideRecord, corpus: &mut TrainingCorpus) -> Result<StageId, &'static str> {
    let stage = record
        .correction_type
        .target_stage()
        .ok_or("correction type does not train a stage")?;
    let context = record.context().ok_or("no model context")?;
    let label = record.corrected_label().ok_or("no corrected label")?;

    let features = match stage {
        StageId::MemberRole => {
            let member = context.member().ok_or("corrected member not found in context")?;
            extract_member_features(member, &context.nodes, context.geometry.as_ref())
        }
        StageId::FrameSystem | StageId::BuildingType => {
            extract_global_features(&context.to_model(record.prediction_id.clone()))
        }
    };
    if features.is_empty() {
        return Err("no features could be extracted");
    }

    corpus.rows_mut(stage).push(features, label);
    Ok(stage)
}
