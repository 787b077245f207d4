//! Strongest off-diagonal pairs of a correlation matrix.

use crate::correlation::CorrelationMatrix;
use serde::{Deserialize, Serialize};

/// One off-diagonal entry of a correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    /// Row asset
    pub asset_a: String,
    /// Column asset
    pub asset_b: String,
    /// Pearson correlation
    pub correlation: f64,
}

/// The `k` pairs with the largest absolute correlation.
///
/// Scans the strict upper triangle row by row, skips undefined entries and
/// sorts by `|r|` descending. Ties keep scan order.
pub fn top_k(matrix: &CorrelationMatrix, k: usize) -> Vec<CorrelationPair> {
    let mut pairs: Vec<CorrelationPair> = matrix
        .upper_triangle()
        .filter_map(|(i, j, r)| {
            r.map(|correlation| CorrelationPair {
                asset_a: matrix.names()[i].clone(),
                asset_b: matrix.names()[j].clone(),
                correlation,
            })
        })
        .collect();

    pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    pairs.truncate(k);
    pairs
}
