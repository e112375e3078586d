//! Framewise Core
//!
//! Core types, traits, and utilities shared across Framewise components.
//!
//! This crate provides:
//! - The structural graph model (nodes, members, geometry)
//! - Error types and result handling
//! - The model validation contract consumed before classification

pub mod error;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
pub use types::{FeatureVector, Geometry, Member, Node, Restraints, StructuralModel};
pub use validate::{IntegrityValidator, ModelValidator, ValidationOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{FeatureVector, Geometry, Member, Node, Restraints, StructuralModel};
    pub use crate::validate::{IntegrityValidator, ModelValidator, ValidationOutcome};
}
