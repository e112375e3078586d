//! Quantile binning of a feature matrix

/// Upper bound on bins per feature; bin ids fit in a `u8`
pub const MAX_BINS: usize = 64;

/// Column-major binned copy of a matrix plus the bin edges
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// `bins[feature][row]`
    bins: Vec<Vec<u8>>,
    /// `thresholds[feature][b]` is the upper edge of bin `b`
    thresholds: Vec<Vec<f64>>,
    n_rows: usize,
}

impl BinnedMatrix {
    /// Bin every column of a row-major matrix
    pub fn new(x: &[Vec<f64>]) -> Self {
        let n_rows = x.len();
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut bins = Vec::with_capacity(n_features);
        let mut thresholds = Vec::with_capacity(n_features);

        for j in 0..n_features {
            let column: Vec<f64> = x.iter().map(|r| r[j]).collect();
            let edges = edges(&column);
            let binned = column.iter().map(|v| bin_of(&edges, *v)).collect();
            bins.push(binned);
            thresholds.push(edges);
        }

        Self {
            bins,
            thresholds,
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.bins.len()
    }

    /// Number of bins of a feature (edges + 1)
    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn bin(&self, feature: usize, row: usize) -> usize {
        self.bins[feature][row] as usize
    }

    /// Raw-value threshold equivalent to "bin <= b"
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }
}

/// Midpoints between distinct values, thinned to quantiles when there are too many
fn edges(column: &[f64]) -> Vec<f64> {
    let mut distinct = column.to_vec();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();

    if distinct.len() <= MAX_BINS {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let mut out: Vec<f64> = (1..MAX_BINS)
        .map(|i| {
            let idx = i * distinct.len() / MAX_BINS;
            (distinct[idx - 1] + distinct[idx]) / 2.0
        })
        .collect();
    out.dedup();
    out
}

/// Index of the first edge >= value, or the last bin
fn bin_of(edges: &[f64], value: f64) -> u8 {
    edges.partition_point(|e| *e < value) as u8
}
