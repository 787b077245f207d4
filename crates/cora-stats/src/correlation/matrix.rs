//! Named correlation matrices.

use crate::error::{Result, StatsError};
use ndarray::Array2;

/// Square, symmetric matrix of correlations indexed by asset name.
///
/// Entries that could not be computed (zero variance, fewer than two
/// overlapping observations) are stored internally as NaN and surface as
/// `None` through every accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Build a matrix from names and raw values.
    ///
    /// Non-finite values mark undefined entries; finite values are clamped to [-1, 1].
    ///
    /// # Errors
    /// Returns [`StatsError::DimensionMismatch`] if `values` is not square or its
    /// size differs from the number of names.
    pub fn new(names: Vec<String>, mut values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != cols {
            return Err(StatsError::DimensionMismatch {
                expected: rows,
                actual: cols,
            });
        }
        if rows != names.len() {
            return Err(StatsError::DimensionMismatch {
                expected: names.len(),
                actual: rows,
            });
        }

        values.mapv_inplace(|v| if v.is_finite() { v.clamp(-1.0, 1.0) } else { f64::NAN });
        Ok(Self { names, values })
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

    /// Position of `name` in the matrix.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Correlation between two named assets.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.get_by_index(self.index_of(a)?, self.index_of(b)?)
    }

    /// Correlation at row `i`, column `j`.
    pub fn get_by_index(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get((i, j)).copied().filter(|v| v.is_finite())
    }

    /// Row-major entries of the strict upper triangle as `(i, j, value)`.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        let n = self.len();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.get_by_index(i, j))))
    }

    /// All entries as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<Option<f64>>> {
        (0..self.len())
            .map(|i| (0..self.len()).map(|j| self.get_by_index(i, j)).collect())
            .collect()
    }

    /// Sub-matrix over the assets at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let names = indices.iter().map(|&i| self.names[i].clone()).collect();
        let values = Array2::from_shape_fn((indices.len(), indices.len()), |(r, c)| {
            self.values[[indices[r], indices[c]]]
        });
        Self { names, values }
    }

    /// Whether every entry is defined.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
