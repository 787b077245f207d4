//! Correlation distance.

use crate::correlation::CorrelationMatrix;
use ndarray::Array2;

/// Pairwise distances `1 - |corr|` between assets.
///
/// The matrix is symmetric with a zero diagonal and entries in [0, 1].
/// Undefined correlations count as zero, i.e. distance 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl DistanceMatrix {
    /// Derive distances from a correlation matrix.
    pub fn from_correlation(matrix: &CorrelationMatrix) -> Self {
        let n = matrix.len();
        let raw = Array2::from_shape_fn((n, n), |(i, j)| {
            1.0 - matrix.get_by_index(i, j).unwrap_or(0.0).abs()
        });

        let mut values = (&raw + &raw.t()) / 2.0;
        values.mapv_inplace(|d| d.max(0.0));
        values.diag_mut().fill(0.0);

        Self {
            names: matrix.names().to_vec(),
            values,
        }
    }

    /// Asset names in row/column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of assets.
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the matrix has no assets.
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Distance between the assets at `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get((i, j)).copied()
    }

    /// Full square matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row-major strict upper triangle.
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| self.values[[i, j]])
            .collect()
    }
}
