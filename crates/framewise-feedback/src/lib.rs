//! Framewise Feedback
//!
//! Human-in-the-loop correction of predictions.
//!
//! Users submit overrides for building types, frame systems, member tags or
//! geometry. Overrides that carry a model snapshot become extra training
//! rows, and once enough have accumulated the retraining orchestrator
//! rebuilds the requested stages in the background and swaps the live model
//! in one step.

pub mod config;
pub mod overrides;
pub mod retrain;
pub mod synthesis;

pub use config::FeedbackConfig;
pub use overrides::{
    CorrectionType, LearningImpact, ModelContext, OverrideReceipt, OverrideRecord, OverrideRequest,
    OverrideStore,
};
pub use retrain::{
    RetrainHandle, RetrainRequest, RetrainState, RetrainStatus, RetrainingOrchestrator, SkippedOverride,
};
pub use synthesis::{synthesize_rows, Synthesis};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::FeedbackConfig;
    pub use crate::overrides::{CorrectionType, OverrideRequest, OverrideStore};
    pub use crate::retrain::{RetrainRequest, RetrainState, RetrainingOrchestrator};
}
