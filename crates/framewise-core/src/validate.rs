//! Structural model validation
//!
//! Classification consumes a `validate(model) -> (ok, errors)` contract.
//! Errors block classification; warnings are advisory and are reported
//! alongside results.

use crate::error::{Error, Result};
use crate::types::StructuralModel;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Member type tags recognised by the rule checker
pub const KNOWN_MEMBER_TYPES: &[&str] = &[
    "BEAM",
    "COLUMN",
    "BRACE",
    "RAFTER",
    "PURLIN",
    "GIRT",
    "STRUT",
    "TRUSS_CHORD",
    "TRUSS_DIAGONAL",
    "CANTILEVER",
];

/// Result of validating a structural model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// Build an outcome; validity follows from the absence of errors
    pub fn new(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Convert into a `Result`, yielding the warnings when valid
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(Error::InvalidModel(self.errors))
        }
    }
}

/// Contract for compliance / integrity rule checkers
pub trait ModelValidator: Send + Sync {
    /// Validator name for logging
    fn name(&self) -> &str;

    /// Check a model
    fn validate(&self, model: &StructuralModel) -> ValidationOutcome;
}

/// Default validator: graph integrity plus AISC 360 / ASCE 7 advisories
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    /// Height above which an ASCE 7 review warning is raised
    pub max_height: f64,
    /// Plan aspect ratio above which a warning is raised
    pub max_plan_aspect_ratio: f64,
    /// Fraction of unconnected nodes above which a warning is raised
    pub max_isolated_node_fraction: f64,
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self {
            max_height: 500.0,
            max_plan_aspect_ratio: 5.0,
            max_isolated_node_fraction: 0.1,
        }
    }
}

impl IntegrityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_graph(model: &StructuralModel, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        if model.nodes.is_empty() {
            errors.push("model has no nodes".to_string());
        }
        if model.members.is_empty() {
            errors.push("model has no members".to_string());
        }

        let mut seen = HashSet::new();
        for node in &model.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("duplicate node id '{}'", node.id));
            }
            if !(node.x.is_finite() && node.y.is_finite() && node.z.is_finite()) {
                errors.push(format!("node '{}' has non-finite coordinates", node.id));
            }
        }

        let mut member_ids = HashSet::new();
        for member in &model.members {
            if !member_ids.insert(member.id.as_str()) {
                errors.push(format!("duplicate member id '{}'", member.id));
            }
        }

        for member in &model.members {
            for end in [&member.start_node_id, &member.end_node_id] {
                if !seen.contains(end.as_str()) {
                    warnings.push(format!(
                        "member '{}' references missing node '{}'",
                        member.id, end
                    ));
                }
            }
            let kind = member.kind();
            if !kind.is_empty() && !KNOWN_MEMBER_TYPES.contains(&kind.as_str()) {
                warnings.push(format!("member '{}' has unknown type '{}'", member.id, kind));
            }
        }
    }

    fn check_aisc(&self, model: &StructuralModel, warnings: &mut Vec<String>) {
        let mut kinds: HashMap<String, usize> = HashMap::new();
        for member in &model.members {
            *kinds.entry(member.kind()).or_default() += 1;
        }
        if model.members.len() > 2 {
            if !kinds.contains_key("COLUMN") {
                warnings.push("AISC 360: no columns identified in a multi-member model".to_string());
            }
            if !kinds.contains_key("BEAM") && !kinds.contains_key("RAFTER") {
                warnings.push("AISC 360: no beams identified in a multi-member model".to_string());
            }
        }

        if !model.nodes.is_empty() {
            let connected: HashSet<&str> = model
                .members
                .iter()
                .flat_map(|m| [m.start_node_id.as_str(), m.end_node_id.as_str()])
                .collect();
            let isolated = model
                .nodes
                .iter()
                .filter(|n| !connected.contains(n.id.as_str()))
                .count();
            if isolated as f64 > self.max_isolated_node_fraction * model.nodes.len() as f64 {
                warnings.push(format!(
                    "AISC 360: {} of {} nodes are not connected to any member",
                    isolated,
                    model.nodes.len()
                ));
            }
        }
    }

    fn check_asce(&self, model: &StructuralModel, warnings: &mut Vec<String>) {
        let Some(geometry) = &model.geometry else {
            return;
        };
        if let Some(height) = geometry.total_height {
            if height > self.max_height {
                warnings.push(format!(
                    "ASCE 7: height {height:.1} exceeds {:.0}, special review required",
                    self.max_height
                ));
            }
        }
        if let (Some(length), Some(width)) = (geometry.building_length, geometry.building_width) {
            if width > 0.0 && length / width > self.max_plan_aspect_ratio {
                warnings.push(format!(
                    "ASCE 7: plan aspect ratio {:.2} may indicate torsional irregularity",
                    length / width
                ));
            }
        }
    }
}

impl ModelValidator for IntegrityValidator {
    fn name(&self) -> &str {
        "integrity"
    }

    fn validate(&self, model: &StructuralModel) -> ValidationOutcome {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        Self::check_graph(model, &mut errors, &mut warnings);
        if errors.is_empty() {
            self.check_aisc(model, &mut warnings);
            self.check_asce(model, &mut warnings);
        }
        if !errors.is_empty() {
            tracing::debug!(model = %model.id, errors = errors.len(), "model failed validation");
        }
        ValidationOutcome::new(errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Geometry, Member, Node};

    fn portal() -> StructuralModel {
        let mut model = StructuralModel::new("portal");
        model.nodes = vec![
            Node::new("a", 0.0, 0.0, 0.0),
            Node::new("b", 0.0, 0.0, 5.0),
            Node::new("c", 10.0, 0.0, 5.0),
            Node::new("d", 10.0, 0.0, 0.0),
        ];
        model.members = vec![
            Member::new("c1", "a", "b").with_type("COLUMN"),
            Member::new("b1", "b", "c").with_type("BEAM"),
            Member::new("c2", "d", "c").with_type("COLUMN"),
        ];
        model
    }

    #[test]
    fn test_valid_portal() {
        let outcome = IntegrityValidator::new().validate(&portal());
        assert!(outcome.is_valid);
        assert!(outcome.errors.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_empty_model_is_invalid() {
        let outcome = IntegrityValidator::new().validate(&StructuralModel::new("empty"));
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 2);
        assert!(matches!(outcome.into_result(), Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_duplicate_node_is_error() {
        let mut model = portal();
        model.nodes.push(Node::new("a", 1.0, 1.0, 1.0));
        let outcome = IntegrityValidator::new().validate(&model);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].contains("duplicate"));
    }

    #[test]
    fn test_duplicate_member_is_error() {
        let mut model = portal();
        model.members.push(Member::new("b1", "a", "c").with_type("BRACE"));
        let outcome = IntegrityValidator::new().validate(&model);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors, vec!["duplicate member id 'b1'".to_string()]);
        assert!(matches!(outcome.into_result(), Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_dangling_reference_is_warning() {
        let mut model = portal();
        model.members.push(Member::new("x1", "a", "ghost").with_type("BRACE"));
        let outcome = IntegrityValidator::new().validate(&model);
        assert!(outcome.is_valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_asce_advisories() {
        let mut model = portal();
        model.geometry = Some(Geometry::with_extents(600.0, 100.0, 650.0));
        let warnings = IntegrityValidator::new().validate(&model).into_result().unwrap();
        assert!(warnings.iter().any(|w| w.contains("height")));
        assert!(warnings.iter().any(|w| w.contains("aspect ratio")));
    }
}
