//! Member-level features (AISC 360 oriented)

use crate::schema::MEMBER_TYPE_FLAGS;
use crate::stats::flag;
use framewise_core::{FeatureVector, Geometry, Member, Node, StructuralModel};
use std::collections::BTreeMap;

/// Radius of gyration assumed when the member carries none; also the floor
const DEFAULT_RADIUS_OF_GYRATION: f64 = 0.1;

/// Extract the feature vector of one member.
///
/// Returns an empty vector when either end node is missing from `nodes`.
/// Missing geometry fields default to 1.0.
pub fn extract_member_features(
    member: &Member,
    nodes: &[Node],
    geometry: Option<&Geometry>,
) -> FeatureVector {
    let start = nodes.iter().find(|n| n.id == member.start_node_id);
    let end = nodes.iter().find(|n| n.id == member.end_node_id);
    match (start, end) {
        (Some(start), Some(end)) => member_features(member, start, end, geometry),
        _ => FeatureVector::new(),
    }
}

/// Extract features for every member of a model, keyed by member id.
///
/// Members that cannot be extracted are left out of the map.
pub fn extract_model_member_features(model: &StructuralModel) -> BTreeMap<String, FeatureVector> {
    let index = model.node_index();
    let geometry = model.geometry.as_ref();
    model
        .members
        .iter()
        .filter_map(|member| {
            let start = index.get(member.start_node_id.as_str())?;
            let end = index.get(member.end_node_id.as_str())?;
            Some((member.id.clone(), member_features(member, start, end, geometry)))
        })
        .collect()
}

fn member_features(
    member: &Member,
    start: &Node,
    end: &Node,
    geometry: Option<&Geometry>,
) -> FeatureVector {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let dz = end.z - start.z;

    let length = (dx * dx + dy * dy + dz * dz).sqrt();
    let horizontal = (dx * dx + dy * dy).sqrt();

    let angle_h = if horizontal > 0.0 {
        dz.abs().atan2(horizontal).to_degrees()
    } else {
        90.0
    };
    let angle_v = 90.0 - angle_h;

    let avg_elevation = (start.z + end.z) / 2.0;

    let (building_length, building_width, building_height) = geometry
        .map(|g| (g.length(), g.width(), g.height()))
        .unwrap_or((1.0, 1.0, 1.0));

    let relative_elevation = avg_elevation / building_height.max(1.0);
    let relative_x = (start.x + end.x) / 2.0 / building_length.max(1.0);
    let relative_y = (start.y + end.y) / 2.0 / building_width.max(1.0);

    let radius = member
        .radius_of_gyration
        .unwrap_or(DEFAULT_RADIUS_OF_GYRATION)
        .max(DEFAULT_RADIUS_OF_GYRATION);

    let start_fixity = start.restraints.fixity();
    let end_fixity = end.restraints.fixity();

    let mut f = FeatureVector::new();
    let mut put = |name: &str, value: f64| {
        f.insert(name.to_string(), value);
    };

    put("member_length", length);
    put("horizontal_length", horizontal);
    put("elevation_change", dz.abs());
    put("delta_x", dx.abs());
    put("delta_y", dy.abs());
    put("delta_z", dz.abs());

    put("angle_from_horizontal", angle_h);
    put("angle_from_vertical", angle_v);
    put("slope", dz / horizontal.max(0.001));

    put("start_elevation", start.z);
    put("end_elevation", end.z);
    put("avg_elevation", avg_elevation);
    put("relative_elevation", relative_elevation);
    put("relative_x_position", relative_x);
    put("relative_y_position", relative_y);
    put("floor_level", floor_level(relative_elevation));

    put("slenderness_ratio", length / radius);
    put("is_compression_member", flag(angle_h > 60.0));
    put("is_flexural_member", flag(angle_h < 30.0));
    put("is_tension_member", flag((30.0..=60.0).contains(&angle_h)));

    put("start_fixity_score", start_fixity);
    put("end_fixity_score", end_fixity);
    put("avg_fixity", (start_fixity + end_fixity) / 2.0);

    put("is_vertical", flag(angle_h > 75.0));
    put("is_horizontal", flag(angle_h < 15.0));
    put("is_diagonal", flag((15.0..=75.0).contains(&angle_h)));
    put("is_at_roof", flag(relative_elevation > 0.8));
    put("is_at_foundation", flag(relative_elevation < 0.2));
    put("is_at_eave", flag((0.6..=0.8).contains(&relative_elevation)));

    let kind = member.kind();
    for tag in MEMBER_TYPE_FLAGS {
        put(
            &format!("member_type_{}", tag.to_ascii_lowercase()),
            flag(kind == *tag),
        );
    }

    f
}

/// Four elevation buckets: foundation, ground, upper, roof
fn floor_level(relative_elevation: f64) -> f64 {
    if relative_elevation < 0.2 {
        0.0
    } else if relative_elevation < 0.6 {
        1.0
    } else if relative_elevation < 0.8 {
        2.0
    } else {
        3.0
    }
}
