//! Univariate feature selection by ANOVA F-value

use serde::{Deserialize, Serialize};

/// Frozen top-K column mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelector {
    /// Selected column indices, ascending
    selected: Vec<usize>,
}

impl FeatureSelector {
    /// Keep the `k` columns with the highest F-value.
    ///
    /// Undefined scores (constant columns) rank last; ties keep the lower
    /// column index.
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, k: usize) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let scores = anova_f_scores(x, y, n_classes);

        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|a, b| rank_key(scores[*b]).total_cmp(&rank_key(scores[*a])).then(a.cmp(b)));

        let mut selected: Vec<usize> = order.into_iter().take(k.min(n_features)).collect();
        selected.sort_unstable();
        Self { selected }
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        self.selected.iter().map(|i| row.get(*i).copied().unwrap_or(0.0)).collect()
    }
}

fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// One-way ANOVA F statistic of each column against the class labels
pub fn anova_f_scores(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Vec<f64> {
    let n_features = x.first().map(Vec::len).unwrap_or(0);
    let n = x.len();
    let df_between = n_classes.saturating_sub(1) as f64;
    let df_within = n.saturating_sub(n_classes) as f64;

    let mut counts = vec![0usize; n_classes];
    for label in y {
        counts[*label] += 1;
    }

    (0..n_features)
        .map(|j| {
            if df_between == 0.0 || df_within == 0.0 {
                return f64::NAN;
            }
            let mut sums = vec![0.0; n_classes];
            let mut total = 0.0;
            for (row, label) in x.iter().zip(y) {
                sums[*label] += row[j];
                total += row[j];
            }
            let grand_mean = total / n as f64;
            let class_means: Vec<f64> = sums
                .iter()
                .zip(&counts)
                .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
                .collect();

            let ss_between: f64 = class_means
                .iter()
                .zip(&counts)
                .map(|(m, c)| *c as f64 * (m - grand_mean).powi(2))
                .sum();
            let ss_within: f64 = x
                .iter()
                .zip(y)
                .map(|(row, label)| (row[j] - class_means[*label]).powi(2))
                .sum();

            let between = ss_between / df_between;
            let within = ss_within / df_within;
            if within > 0.0 {
                between / within
            } else if between > 0.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<usize>) {
        // column 0 separates classes, column 1 is noise, column 2 constant
        let x = vec![
            vec![0.0, 1.0, 5.0],
            vec![0.1, 3.0, 5.0],
            vec![0.2, 2.0, 5.0],
            vec![9.0, 2.0, 5.0],
            vec![9.1, 1.0, 5.0],
            vec![9.2, 3.0, 5.0],
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_separating_column_scores_highest() {
        let (x, y) = data();
        let scores = anova_f_scores(&x, &y, 2);
        assert!(scores[0] > scores[1]);
        assert!(scores[2].is_nan());
    }

    #[test]
    fn test_select_top_k() {
        let (x, y) = data();
        let selector = FeatureSelector::fit(&x, &y, 2, 1);
        assert_eq!(selector.selected(), &[0]);
        assert_eq!(selector.transform(&[7.0, 8.0, 9.0]), vec![7.0]);

        // constant column ranks last
        let selector = FeatureSelector::fit(&x, &y, 2, 2);
        assert_eq!(selector.selected(), &[0, 1]);
    }

    #[test]
    fn test_k_larger_than_columns() {
        let (x, y) = data();
        let selector = FeatureSelector::fit(&x, &y, 2, 30);
        assert_eq!(selector.selected(), &[0, 1, 2]);
    }

    #[test]
    fn test_perfect_separation_is_infinite() {
        let x = vec![vec![1.0], vec![1.0], vec![2.0], vec![2.0]];
        let scores = anova_f_scores(&x, &[0, 0, 1, 1], 2);
        assert!(scores[0].is_infinite());
    }
}
