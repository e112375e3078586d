//! Framewise Features
//!
//! Deterministic feature extraction from a structural graph.
//!
//! Two flavours are produced:
//! - member-level vectors, one per member, for member-role classification
//! - building-level vectors, one per model, for frame-system and
//!   building-type classification
//!
//! Extraction never fails: a member whose end nodes cannot be resolved, or a
//! model without nodes or members, yields an empty vector which callers treat
//! as "could not extract".
//!
//! All thresholds are fixed design constants. Changing one changes the
//! feature schema and invalidates trained artifacts.

pub mod building;
pub mod detectors;
pub mod member;
pub mod schema;
mod stats;

pub use building::{extract_global_features, HeightClass};
pub use detectors::{DetectorThresholds, StructuralSystems};
pub use member::{extract_member_features, extract_model_member_features};
pub use schema::{FeatureSchema, GLOBAL_FEATURES, MEMBER_FEATURES, SCHEMA_VERSION};
