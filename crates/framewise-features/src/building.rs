//! Building-level features (ASCE 7 oriented)

use crate::detectors::{is_brace, DetectorThresholds, StructuralSystems};
use crate::schema::BUILDING_MEMBER_TYPES;
use crate::stats::{distinct_sorted, flag, mean, median, std_dev};
use framewise_core::{FeatureVector, Member, Node, StructuralModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gaps between distinct grid coordinates at or below this are noise
const BAY_NOISE_THRESHOLD: f64 = 1.0;
/// Roof members shorter than this in plan do not contribute a slope
const MIN_ROOF_RUN: f64 = 0.1;
/// Nodes within this of the highest elevation count as ridge nodes
const RIDGE_TOLERANCE: f64 = 0.1;
const MAX_FLOORS: usize = 10;
const IRREGULARITY_OFFSET: f64 = 0.05;

/// ASCE 7 height class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeightClass {
    LowRise,
    MidRise,
    HighRise,
}

impl HeightClass {
    pub fn from_height(height: f64) -> Self {
        if height < 60.0 {
            Self::LowRise
        } else if height < 160.0 {
            Self::MidRise
        } else {
            Self::HighRise
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowRise => "LOW_RISE",
            Self::MidRise => "MID_RISE",
            Self::HighRise => "HIGH_RISE",
        }
    }
}

impl std::fmt::Display for HeightClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the building-level feature vector of a model.
///
/// Returns an empty vector when the model has no nodes or no members.
/// Dimensions come from the node bounding box, not from the supplied
/// geometry.
pub fn extract_global_features(model: &StructuralModel) -> FeatureVector {
    let nodes = &model.nodes;
    let members = &model.members;
    if nodes.is_empty() || members.is_empty() {
        return FeatureVector::new();
    }

    let (min_x, max_x) = extent(nodes.iter().map(|n| n.x));
    let (min_y, max_y) = extent(nodes.iter().map(|n| n.y));
    let (min_z, max_z) = extent(nodes.iter().map(|n| n.z));
    let length = max_x - min_x;
    let width = max_y - min_y;
    let height = max_z - min_z;

    let height_class = HeightClass::from_height(height);
    let index = model.node_index();

    let bays_x = bay_sizes(nodes.iter().map(|n| n.x));
    let bays_y = bay_sizes(nodes.iter().map(|n| n.y));
    let centroid_offset = plan_centroid_offset(nodes);
    let slopes = roof_slopes(members, &index);
    let spans: Vec<f64> = members
        .iter()
        .filter_map(|m| member_length(m, &index))
        .collect();
    let max_span = spans.iter().copied().fold(0.0, f64::max);
    let typical_span = median(&spans);

    let node_count = nodes.len() as f64;
    let member_count = members.len() as f64;
    let braces = members.iter().filter(|m| is_brace(m)).count() as f64;
    let moment_nodes = nodes.iter().filter(|n| n.restraints.any_rotation()).count() as f64;
    let (avg_connectivity, max_connectivity) = connectivity(members);
    let systems = StructuralSystems::detect(members, nodes, &DetectorThresholds::STANDARD);

    let mut f = FeatureVector::new();
    let mut put = |name: &str, value: f64| {
        f.insert(name.to_string(), value);
    };

    put("building_length", length);
    put("building_width", width);
    put("building_height", height);
    put("plan_area", length * width);
    put("building_volume", length * width * height);

    put("height_class_low_rise", flag(height_class == HeightClass::LowRise));
    put("height_class_mid_rise", flag(height_class == HeightClass::MidRise));
    put("height_class_high_rise", flag(height_class == HeightClass::HighRise));

    put("aspect_ratio_length_width", length / width.max(0.1));
    put("aspect_ratio_length_height", length / height.max(0.1));
    put("aspect_ratio_width_height", width / height.max(0.1));

    put("floor_count", floor_count(nodes.iter().map(|n| n.z)) as f64);
    put("max_height", height);

    put("bay_size_x_avg", mean(&bays_x));
    put("bay_size_y_avg", mean(&bays_y));
    put("bay_size_x_std", std_dev(&bays_x));
    put("bay_size_y_std", std_dev(&bays_y));
    put("bay_count_x", bays_x.len() as f64);
    put("bay_count_y", bays_y.len() as f64);

    put("plan_centroid_offset", centroid_offset);
    put("plan_irregularity_indicator", flag(centroid_offset > IRREGULARITY_OFFSET));

    put("roof_slope_avg", mean(&slopes));
    put("roof_slope_max", slopes.iter().copied().fold(0.0, f64::max));
    put("roof_slope_std", std_dev(&slopes));
    put("ridge_count", ridge_count(nodes, max_z) as f64);

    put("max_span", max_span);
    put("typical_span", typical_span);
    put("span_ratio", max_span / typical_span.max(1.0));

    put("bracing_ratio", braces / member_count.max(1.0));
    put("moment_joint_ratio", moment_nodes / node_count.max(1.0));

    put("node_count", node_count);
    put("member_count", member_count);
    put("member_node_ratio", member_count / node_count.max(1.0));

    put("avg_node_connectivity", avg_connectivity);
    put("max_node_connectivity", max_connectivity);

    put("has_moment_frame", flag(systems.moment_frame));
    put("has_braced_frame", flag(systems.braced_frame));
    put("has_truss_system", flag(systems.truss_system));
    put("has_cantilever", flag(systems.cantilever));

    for kind in BUILDING_MEMBER_TYPES {
        let count = members.iter().filter(|m| m.kind() == *kind).count() as f64;
        let key = kind.to_ascii_lowercase();
        put(&format!("member_type_{key}_count"), count);
        put(&format!("member_type_{key}_ratio"), count / member_count.max(1.0));
    }

    f
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn member_length(member: &Member, index: &HashMap<&str, &Node>) -> Option<f64> {
    let start = index.get(member.start_node_id.as_str())?;
    let end = index.get(member.end_node_id.as_str())?;
    let (dx, dy, dz) = (end.x - start.x, end.y - start.y, end.z - start.z);
    Some((dx * dx + dy * dy + dz * dz).sqrt())
}

/// Distinct elevations grouped by half the average level gap, capped at ten
fn floor_count(z: impl Iterator<Item = f64>) -> usize {
    let levels = distinct_sorted(z);
    if levels.len() <= 2 {
        return 1;
    }
    let gaps: Vec<f64> = levels.windows(2).map(|w| w[1] - w[0]).collect();
    let threshold = mean(&gaps) * 0.5;
    let floors = 1 + gaps.iter().filter(|g| **g > threshold).count();
    floors.min(MAX_FLOORS)
}

fn bay_sizes(coords: impl Iterator<Item = f64>) -> Vec<f64> {
    distinct_sorted(coords)
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|gap| *gap > BAY_NOISE_THRESHOLD)
        .collect()
}

/// Larger of the per-axis offsets between node centroid and bounding-box
/// centre, each normalized by that axis' extent
fn plan_centroid_offset(nodes: &[Node]) -> f64 {
    let xs: Vec<f64> = nodes.iter().map(|n| n.x).collect();
    let ys: Vec<f64> = nodes.iter().map(|n| n.y).collect();
    let (min_x, max_x) = extent(xs.iter().copied());
    let (min_y, max_y) = extent(ys.iter().copied());
    let offset_x = (mean(&xs) - (min_x + max_x) / 2.0).abs() / (max_x - min_x).max(1.0);
    let offset_y = (mean(&ys) - (min_y + max_y) / 2.0).abs() / (max_y - min_y).max(1.0);
    offset_x.max(offset_y)
}

/// Pitch in degrees of rafters, beams and members tagged "roof"
fn roof_slopes(members: &[Member], index: &HashMap<&str, &Node>) -> Vec<f64> {
    members
        .iter()
        .filter(|m| matches!(m.kind().as_str(), "RAFTER" | "BEAM") || m.tag_contains("roof"))
        .filter_map(|m| {
            let start = index.get(m.start_node_id.as_str())?;
            let end = index.get(m.end_node_id.as_str())?;
            let run = ((end.x - start.x).powi(2) + (end.y - start.y).powi(2)).sqrt();
            (run > MIN_ROOF_RUN).then(|| ((end.z - start.z).abs() / run).atan().to_degrees())
        })
        .collect()
}

fn ridge_count(nodes: &[Node], max_z: f64) -> usize {
    let high = nodes
        .iter()
        .filter(|n| (n.z - max_z).abs() < RIDGE_TOLERANCE)
        .count();
    (high / 3).max(1)
}

/// Average and maximum member count per referenced node
fn connectivity(members: &[Member]) -> (f64, f64) {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for member in members {
        *degree.entry(member.start_node_id.as_str()).or_default() += 1;
        *degree.entry(member.end_node_id.as_str()).or_default() += 1;
    }
    if degree.is_empty() {
        return (0.0, 0.0);
    }
    let values: Vec<f64> = degree.values().map(|d| *d as f64).collect();
    (mean(&values), values.iter().copied().fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_class_boundaries() {
        assert_eq!(HeightClass::from_height(59.9), HeightClass::LowRise);
        assert_eq!(HeightClass::from_height(60.0), HeightClass::MidRise);
        assert_eq!(HeightClass::from_height(159.9), HeightClass::MidRise);
        assert_eq!(HeightClass::from_height(160.0), HeightClass::HighRise);
        assert_eq!(HeightClass::HighRise.to_string(), "HIGH_RISE");
    }

    #[test]
    fn test_floor_count_grouping() {
        assert_eq!(floor_count([0.0, 4.0].into_iter()), 1);
        // gaps 4, 4, 4: every gap exceeds half the mean
        assert_eq!(floor_count([0.0, 4.0, 8.0, 12.0].into_iter()), 4);
        // gaps 4, 0.2, 4: the small gap is merged
        assert_eq!(floor_count([0.0, 4.0, 4.2, 8.2].into_iter()), 3);
        let tower = (0..30).map(|i| i as f64 * 3.0);
        assert_eq!(floor_count(tower), MAX_FLOORS);
    }

    #[test]
    fn test_bay_sizes_ignore_noise() {
        let bays = bay_sizes([0.0, 0.5, 6.0, 12.0, 12.8].into_iter());
        assert_eq!(bays, vec![5.5, 6.0]);
    }

    #[test]
    fn test_ridge_count_minimum_one() {
        let nodes = vec![Node::new("a", 0.0, 0.0, 5.0)];
        assert_eq!(ridge_count(&nodes, 5.0), 1);
    }

    #[test]
    fn test_empty_model_yields_empty() {
        assert!(extract_global_features(&StructuralModel::new("empty")).is_empty());
        let mut nodes_only = StructuralModel::new("nodes");
        nodes_only.nodes.push(Node::new("a", 0.0, 0.0, 0.0));
        assert!(extract_global_features(&nodes_only).is_empty());
    }
}
