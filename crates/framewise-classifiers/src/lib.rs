//! Framewise Classifiers
//!
//! Cascaded ensemble classification of structural models.
//!
//! Three stages are trained from extracted features:
//! - `member_role`: role of each member (column, beam, brace, ...)
//! - `frame_system`: lateral system of the building (moment, braced, truss, ...)
//! - `building_type`: building taxonomy, consuming the global features plus
//!   the frame-system probability vector
//!
//! Each stage freezes its own feature selection, robust scaling and label
//! encoding together with a soft-voting ensemble of a random forest and two
//! gradient-boosted tree models. Trained stages are published together as an
//! immutable, versioned [`ModelSet`] behind a [`LiveModel`].

pub mod artifact;
pub mod cascade;
pub mod config;
pub mod corpus;
pub mod ensemble;
pub mod evaluation;
pub mod preprocess;
pub mod reasoning;
pub mod registry;
pub mod seismic;
pub mod service;
pub mod stage;
pub mod store;
pub mod tree;

pub use artifact::{rank_alternatives, Alternative, ModelSet, StageArtifact, StagePrediction};
pub use cascade::{augment_with_frame_probabilities, frame_probability_names, train_stage, CascadeTrainer};
pub use config::{BoostingParams, ClassifierConfig, EvaluationConfig, ForestParams, StageConfig};
pub use corpus::{LabeledRows, SampleCorpus, SampleKind, TrainingCorpus};
pub use ensemble::{ProbabilisticClassifier, SoftVotingEnsemble};
pub use evaluation::{ClassMetrics, ModelPerformance};
pub use preprocess::{FeatureSelector, LabelEncoder, Preprocessor, RobustScaler};
pub use registry::LiveModel;
pub use seismic::SeismicParameters;
pub use service::{
    BuildingClassification, ClassificationService, MemberClassification, ModelClassification, ModelInfo, StageInfo,
    STAGE_INFO_IMPORTANCE,
};
pub use stage::{StageId, FRAME_PROBABILITY_PREFIX};
pub use store::{ArtifactStore, FileArtifactStore, MemoryArtifactStore, ModelMetadata, StageSummary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifact::{ModelSet, StageArtifact};
    pub use crate::cascade::CascadeTrainer;
    pub use crate::config::ClassifierConfig;
    pub use crate::corpus::{SampleCorpus, TrainingCorpus};
    pub use crate::registry::LiveModel;
    pub use crate::service::ClassificationService;
    pub use crate::stage::StageId;
    pub use crate::store::{ArtifactStore, FileArtifactStore};
}
