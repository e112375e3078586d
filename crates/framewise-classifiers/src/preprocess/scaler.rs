//! Median / IQR robust scaling

use serde::{Deserialize, Serialize};

/// Per-column centre and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustScaler {
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl RobustScaler {
    /// Fit on a row-major matrix. Zero-IQR columns get unit scale.
    pub fn fit(x: &[Vec<f64>]) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut center = Vec::with_capacity(n_features);
        let mut scale = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let mut column: Vec<f64> = x.iter().map(|row| row[j]).collect();
            column.sort_by(|a, b| a.total_cmp(b));
            center.push(percentile(&column, 0.5));
            let iqr = percentile(&column, 0.75) - percentile(&column, 0.25);
            scale.push(if iqr > 0.0 && iqr.is_finite() { iqr } else { 1.0 });
        }
        Self { center, scale }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(v, (c, s))| (v - c) / s)
            .collect()
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

/// Linear-interpolation percentile of sorted data
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
