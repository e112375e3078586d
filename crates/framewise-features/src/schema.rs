//! Fixed, versioned feature schemas
//!
//! Every non-empty vector produced by the extractors has exactly the key set
//! listed here.

use framewise_core::FeatureVector;
use serde::{Deserialize, Serialize};

/// Bump when a feature is added, removed or redefined
pub const SCHEMA_VERSION: u32 = 1;

/// Member type tags that get a one-hot flag at member level
pub const MEMBER_TYPE_FLAGS: &[&str] = &[
    "BEAM",
    "COLUMN",
    "BRACE",
    "RAFTER",
    "PURLIN",
    "TRUSS_CHORD",
    "TRUSS_DIAGONAL",
];

/// Member type tags counted at building level
pub const BUILDING_MEMBER_TYPES: &[&str] = &[
    "BEAM",
    "COLUMN",
    "BRACE",
    "TRUSS_CHORD",
    "TRUSS_DIAGONAL",
    "RAFTER",
    "PURLIN",
];

pub const MEMBER_FEATURES: &[&str] = &[
    "member_length",
    "horizontal_length",
    "elevation_change",
    "delta_x",
    "delta_y",
    "delta_z",
    "angle_from_horizontal",
    "angle_from_vertical",
    "slope",
    "start_elevation",
    "end_elevation",
    "avg_elevation",
    "relative_elevation",
    "relative_x_position",
    "relative_y_position",
    "floor_level",
    "slenderness_ratio",
    "is_compression_member",
    "is_flexural_member",
    "is_tension_member",
    "start_fixity_score",
    "end_fixity_score",
    "avg_fixity",
    "is_vertical",
    "is_horizontal",
    "is_diagonal",
    "is_at_roof",
    "is_at_foundation",
    "is_at_eave",
    "member_type_beam",
    "member_type_column",
    "member_type_brace",
    "member_type_rafter",
    "member_type_purlin",
    "member_type_truss_chord",
    "member_type_truss_diagonal",
];

pub const GLOBAL_FEATURES: &[&str] = &[
    "building_length",
    "building_width",
    "building_height",
    "plan_area",
    "building_volume",
    "height_class_low_rise",
    "height_class_mid_rise",
    "height_class_high_rise",
    "aspect_ratio_length_width",
    "aspect_ratio_length_height",
    "aspect_ratio_width_height",
    "floor_count",
    "max_height",
    "bay_size_x_avg",
    "bay_size_y_avg",
    "bay_size_x_std",
    "bay_size_y_std",
    "bay_count_x",
    "bay_count_y",
    "plan_centroid_offset",
    "plan_irregularity_indicator",
    "roof_slope_avg",
    "roof_slope_max",
    "roof_slope_std",
    "ridge_count",
    "max_span",
    "typical_span",
    "span_ratio",
    "bracing_ratio",
    "moment_joint_ratio",
    "node_count",
    "member_count",
    "member_node_ratio",
    "avg_node_connectivity",
    "max_node_connectivity",
    "has_moment_frame",
    "has_braced_frame",
    "has_truss_system",
    "has_cantilever",
    "member_type_beam_count",
    "member_type_beam_ratio",
    "member_type_column_count",
    "member_type_column_ratio",
    "member_type_brace_count",
    "member_type_brace_ratio",
    "member_type_truss_chord_count",
    "member_type_truss_chord_ratio",
    "member_type_truss_diagonal_count",
    "member_type_truss_diagonal_ratio",
    "member_type_rafter_count",
    "member_type_rafter_ratio",
    "member_type_purlin_count",
    "member_type_purlin_ratio",
];

/// Which extractor a stage consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    Member,
    Global,
}

impl FeatureSchema {
    /// Declared feature names
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Self::Member => MEMBER_FEATURES,
            Self::Global => GLOBAL_FEATURES,
        }
    }

    /// Whether a vector carries exactly the declared keys
    pub fn matches(&self, features: &FeatureVector) -> bool {
        let names = self.names();
        features.len() == names.len() && names.iter().all(|n| features.contains_key(*n))
    }
}
