//! Human-readable reasons for a building classification

use framewise_core::FeatureVector;

/// Upper bound on reasons returned
pub const MAX_REASONS: usize = 10;

const TOP_FEATURES: usize = 5;

/// Explain a building prediction from its features and the stage's importance ranking.
///
/// `importance` is expected sorted descending, as stored in the stage performance.
pub fn building_reasons(features: &FeatureVector, importance: &[(String, f64)]) -> Vec<String> {
    let mut reasons: Vec<String> = importance
        .iter()
        .filter_map(|(name, weight)| {
            features
                .get(name)
                .map(|value| format!("{name}: {value:.2} (importance: {weight:.3})"))
        })
        .take(TOP_FEATURES)
        .collect();

    let get = |name: &str| features.get(name).copied();

    if let (Some(length), Some(width)) = (get("building_length"), get("building_width")) {
        reasons.push(format!("Building dimensions: {length:.1}m x {width:.1}m"));
    }

    if let Some(ratio) = get("aspect_ratio_length_width") {
        if ratio > 2.0 {
            reasons.push("Long, narrow structure suggests hangar or industrial building".to_string());
        } else if ratio < 0.8 {
            reasons.push("Square footprint suggests multi-story or specialized structure".to_string());
        }
    }

    if let (Some(height), Some(width)) = (get("building_height"), get("building_width")) {
        if height > width {
            reasons.push("Height exceeds width, likely a vertical structure".to_string());
        }
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(pairs: &[(&str, f64)]) -> FeatureVector {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_long_hangar_reasons() {
        let f = features(&[
            ("building_length", 120.0),
            ("building_width", 40.0),
            ("building_height", 20.0),
            ("aspect_ratio_length_width", 3.0),
        ]);
        let importance = vec![
            ("building_length".to_string(), 0.4),
            ("missing_feature".to_string(), 0.3),
            ("building_width".to_string(), 0.1),
        ];
        let reasons = building_reasons(&f, &importance);
        assert_eq!(reasons[0], "building_length: 120.00 (importance: 0.400)");
        assert_eq!(reasons[1], "building_width: 40.00 (importance: 0.100)");
        assert_eq!(reasons[2], "Building dimensions: 120.0m x 40.0m");
        assert!(reasons[3].starts_with("Long, narrow"));
        assert_eq!(reasons.len(), 4);
    }

    #[test]
    fn test_tall_structure_and_cap() {
        let f = features(&[
            ("building_length", 10.0),
            ("building_width", 10.0),
            ("building_height", 60.0),
            ("aspect_ratio_length_width", 0.5),
        ]);
        let importance: Vec<(String, f64)> = (0..8)
            .map(|i| (["building_length", "building_width", "building_height"][i % 3].to_string(), 0.1))
            .collect();
        let reasons = building_reasons(&f, &importance);
        assert!(reasons.len() <= MAX_REASONS);
        assert!(reasons.iter().any(|r| r.starts_with("Square footprint")));
        assert!(reasons.iter().any(|r| r.starts_with("Height exceeds width")));
    }
}
