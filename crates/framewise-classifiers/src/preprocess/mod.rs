//! Preprocessing: imputation, feature selection, robust scaling, label encoding
//!
//! Fit once at training time and frozen into the stage artifact; inference
//! applies exactly the same transformation.

mod encoder;
mod scaler;
mod select;

pub use encoder::LabelEncoder;
pub use scaler::RobustScaler;
pub use select::{anova_f_scores, FeatureSelector};

use framewise_core::{Error, FeatureVector, Result};
use serde::{Deserialize, Serialize};

/// Vectorize one feature map in `names` order; missing or non-finite values become 0.
///
/// Training matrices go through here. Inference checks presence first, see
/// [`Preprocessor::transform`].
pub fn vectorize(features: &FeatureVector, names: &[String]) -> Vec<f64> {
    names
        .iter()
        .map(|name| match features.get(name) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        })
        .collect()
}

/// Vectorize a batch of feature maps
pub fn to_matrix(rows: &[FeatureVector], names: &[String]) -> Vec<Vec<f64>> {
    rows.iter().map(|r| vectorize(r, names)).collect()
}

/// Frozen preprocessing of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    /// Input feature names, in matrix column order
    feature_names: Vec<String>,
    selector: FeatureSelector,
    scaler: RobustScaler,
    encoder: LabelEncoder,
}

impl Preprocessor {
    /// Fit selection and scaling on an imputed training matrix
    pub fn fit(
        feature_names: Vec<String>,
        x_train: &[Vec<f64>],
        y_train: &[usize],
        encoder: LabelEncoder,
        top_k: usize,
    ) -> Self {
        let selector = FeatureSelector::fit(x_train, y_train, encoder.len(), top_k);
        let selected: Vec<Vec<f64>> = x_train.iter().map(|r| selector.transform(r)).collect();
        let scaler = RobustScaler::fit(&selected);
        Self {
            feature_names,
            selector,
            scaler,
            encoder,
        }
    }

    /// Select and scale an already vectorized row
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        self.scaler.transform(&self.selector.transform(row))
    }

    /// Trained input features absent from `features`
    pub fn missing_features<'a>(&'a self, features: &FeatureVector) -> Vec<&'a str> {
        self.feature_names
            .iter()
            .filter(|name| !features.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Vectorize, select and scale one feature map.
    ///
    /// Every trained input feature must be present; non-finite values are
    /// imputed to 0.
    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let missing = self.missing_features(features);
        if !missing.is_empty() {
            return Err(Error::input(format!(
                "missing {} trained feature(s): {}",
                missing.len(),
                preview(&missing)
            )));
        }
        Ok(self.transform_imputed(features))
    }

    /// Vectorize, select and scale with missing features imputed to 0
    pub(crate) fn transform_imputed(&self, features: &FeatureVector) -> Vec<f64> {
        self.transform_row(&vectorize(features, &self.feature_names))
    }

    pub fn transform_batch(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Names of the columns that survive selection
    pub fn selected_features(&self) -> Vec<&str> {
        self.selector
            .selected()
            .iter()
            .filter_map(|i| self.feature_names.get(*i).map(String::as_str))
            .collect()
    }

    pub fn selector(&self) -> &FeatureSelector {
        &self.selector
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}

/// First few names of a list, for error messages
pub(crate) fn preview(names: &[&str]) -> String {
    const SHOWN: usize = 5;
    let mut text = names.iter().take(SHOWN).copied().collect::<Vec<_>>().join(", ");
    if names.len() > SHOWN {
        text.push_str(&format!(", ... ({} more)", names.len() - SHOWN));
    }
    text
}
