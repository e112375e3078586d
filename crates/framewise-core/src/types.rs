//! Core types for Framewise
//!
//! A structural model is a graph: nodes carry coordinates and support
//! restraints, members connect two nodes. Building-level geometry is
//! optional and may disagree with the node coordinates; extractors recompute
//! from nodes where it matters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named numeric features. Ordered so that serialized output is stable.
pub type FeatureVector = BTreeMap<String, f64>;

/// Restraint flags for the six degrees of freedom of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restraints {
    pub dx: bool,
    pub dy: bool,
    pub dz: bool,
    pub rx: bool,
    pub ry: bool,
    pub rz: bool,
}

impl Restraints {
    /// Fully fixed support
    pub fn fixed() -> Self {
        Self {
            dx: true,
            dy: true,
            dz: true,
            rx: true,
            ry: true,
            rz: true,
        }
    }

    /// Translations restrained, rotations free
    pub fn pinned() -> Self {
        Self {
            dx: true,
            dy: true,
            dz: true,
            ..Self::default()
        }
    }

    /// Number of restrained degrees of freedom (0..=6)
    pub fn count(&self) -> usize {
        [self.dx, self.dy, self.dz, self.rx, self.ry, self.rz]
            .iter()
            .filter(|r| **r)
            .count()
    }

    /// Fraction of the six degrees of freedom that are restrained
    pub fn fixity(&self) -> f64 {
        self.count() as f64 / 6.0
    }

    pub fn any_translation(&self) -> bool {
        self.dx || self.dy || self.dz
    }

    pub fn any_rotation(&self) -> bool {
        self.rx || self.ry || self.rz
    }
}

/// A node of the structural graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub restraints: Restraints,
}

impl Node {
    /// Create an unrestrained node
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            z,
            restraints: Restraints::default(),
        }
    }

    /// Set the support restraints
    pub fn with_restraints(mut self, restraints: Restraints) -> Self {
        self.restraints = restraints;
        self
    }
}

/// A member connecting two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub start_node_id: String,
    pub end_node_id: String,

    /// Member type tag such as COLUMN, BEAM or BRACE
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,

    /// Free-text tag, e.g. "roof rafter"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Ground-truth structural role (training only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Section radius of gyration, used by the slenderness feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_of_gyration: Option<f64>,
}

impl Member {
    /// Create an untyped member
    pub fn new(
        id: impl Into<String>,
        start_node_id: impl Into<String>,
        end_node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_node_id: start_node_id.into(),
            end_node_id: end_node_id.into(),
            member_type: None,
            tag: None,
            role: None,
            radius_of_gyration: None,
        }
    }

    /// Set the member type tag
    pub fn with_type(mut self, member_type: impl Into<String>) -> Self {
        self.member_type = Some(member_type.into());
        self
    }

    /// Set the free-text tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the ground-truth role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Member type normalized to upper case, empty when absent
    pub fn kind(&self) -> String {
        self.member_type
            .as_deref()
            .map(|t| t.trim().to_ascii_uppercase())
            .unwrap_or_default()
    }

    /// Case-insensitive substring match against the free-text tag
    pub fn tag_contains(&self, needle: &str) -> bool {
        self.tag
            .as_deref()
            .map(|t| t.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

/// Building-level scalars supplied with a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Geometry {
    pub building_length: Option<f64>,
    pub building_width: Option<f64>,
    pub total_height: Option<f64>,
    pub eave_height: Option<f64>,
    pub roof_slope: Option<f64>,
    pub frame_count: Option<u32>,
    pub bay_spacings: Vec<f64>,
}

impl Geometry {
    /// Geometry with the three plan/elevation extents set
    pub fn with_extents(length: f64, width: f64, height: f64) -> Self {
        Self {
            building_length: Some(length),
            building_width: Some(width),
            total_height: Some(height),
            ..Self::default()
        }
    }

    /// Building length, 1.0 when unknown
    pub fn length(&self) -> f64 {
        self.building_length.unwrap_or(1.0)
    }

    /// Building width, 1.0 when unknown
    pub fn width(&self) -> f64 {
        self.building_width.unwrap_or(1.0)
    }

    /// Total height, 1.0 when unknown
    pub fn height(&self) -> f64 {
        self.total_height.unwrap_or(1.0)
    }
}

/// A complete structural model with optional ground-truth labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diaphragm_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_shape: Option<String>,
}

impl StructuralModel {
    /// Create an empty model
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Parse a model from JSON text
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Node lookup by id
    pub fn node_index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Find a member by id
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }
}
