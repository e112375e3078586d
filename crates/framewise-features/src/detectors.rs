//! Heuristic structural-system detectors
//!
//! Each detector is a pure function over the model's members and nodes with
//! a single empirical threshold. Thresholds live in [`DetectorThresholds`]
//! so they can be exercised in isolation; [`DetectorThresholds::STANDARD`]
//! is the set the feature schema is defined against.

use framewise_core::{Member, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Empirical thresholds for the structural-system detectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorThresholds {
    /// Moment frame: fraction of nodes with any rotational restraint
    pub moment_node_fraction: f64,
    /// Braced frame: fraction of members that are braces
    pub braced_member_fraction: f64,
    /// Truss system: fraction of members that are truss members
    pub truss_member_fraction: f64,
    /// Cantilever: fraction of members touching no translationally restrained node
    pub cantilever_member_fraction: f64,
}

impl DetectorThresholds {
    pub const STANDARD: Self = Self {
        moment_node_fraction: 0.3,
        braced_member_fraction: 0.1,
        truss_member_fraction: 0.2,
        cantilever_member_fraction: 0.1,
    };
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Detector outputs for one model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSystems {
    pub moment_frame: bool,
    pub braced_frame: bool,
    pub truss_system: bool,
    pub cantilever: bool,
}

impl StructuralSystems {
    /// Run all four detectors
    pub fn detect(members: &[Member], nodes: &[Node], thresholds: &DetectorThresholds) -> Self {
        Self {
            moment_frame: detect_moment_frame(members, nodes, thresholds.moment_node_fraction),
            braced_frame: detect_braced_frame(members, thresholds.braced_member_fraction),
            truss_system: detect_truss_system(members, thresholds.truss_member_fraction),
            cantilever: detect_cantilever(members, nodes, thresholds.cantilever_member_fraction),
        }
    }
}

pub fn is_brace(member: &Member) -> bool {
    member.kind() == "BRACE" || member.tag_contains("brace")
}

pub fn is_truss(member: &Member) -> bool {
    matches!(member.kind().as_str(), "TRUSS_CHORD" | "TRUSS_DIAGONAL") || member.tag_contains("truss")
}

/// Beams and columns both present and enough rotationally restrained nodes
pub fn detect_moment_frame(members: &[Member], nodes: &[Node], node_fraction: f64) -> bool {
    let beams = members.iter().filter(|m| m.kind() == "BEAM").count();
    let columns = members.iter().filter(|m| m.kind() == "COLUMN").count();
    let moment_nodes = nodes.iter().filter(|n| n.restraints.any_rotation()).count();
    beams > 0 && columns > 0 && moment_nodes as f64 > nodes.len() as f64 * node_fraction
}

pub fn detect_braced_frame(members: &[Member], member_fraction: f64) -> bool {
    let braces = members.iter().filter(|m| is_brace(m)).count();
    braces as f64 > members.len() as f64 * member_fraction
}

pub fn detect_truss_system(members: &[Member], member_fraction: f64) -> bool {
    let truss = members.iter().filter(|m| is_truss(m)).count();
    truss as f64 > members.len() as f64 * member_fraction
}

/// Members with neither end on a translationally restrained node
pub fn detect_cantilever(members: &[Member], nodes: &[Node], member_fraction: f64) -> bool {
    let supports: HashSet<&str> = nodes
        .iter()
        .filter(|n| n.restraints.any_translation())
        .map(|n| n.id.as_str())
        .collect();
    let free = members
        .iter()
        .filter(|m| {
            !supports.contains(m.start_node_id.as_str()) && !supports.contains(m.end_node_id.as_str())
        })
        .count();
    free as f64 > members.len() as f64 * member_fraction
}
