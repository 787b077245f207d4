//! Hierarchical clustering of assets by co-movement.
//!
//! Correlations become distances `1 - |r|`, Ward linkage builds the tree, and
//! the tree is cut into a fixed number of flat clusters. Cluster ids run from
//! 1 in depth-first order of the tree, left child first.

pub mod distance;
pub mod linkage;

pub use distance::DistanceMatrix;
pub use linkage::{Dendrogram, MergeStep, ward_linkage};

use crate::correlation::CorrelationMatrix;
use crate::error::{Result, StatsError};
use tracing::debug;

/// Flat cluster id of every asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    assets: Vec<String>,
    labels: Vec<usize>,
}

impl ClusterAssignment {
    /// Cluster id of `asset`.
    pub fn get(&self, asset: &str) -> Option<usize> {
        let position = self.assets.iter().position(|a| a == asset)?;
        self.labels.get(position).copied()
    }

    /// Cluster ids aligned with the asset order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// `(asset, cluster id)` pairs in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
    }

    /// Number of distinct clusters.
    pub fn cluster_count(&self) -> usize {
        self.labels.iter().copied().max().unwrap_or(0)
    }
}

/// One flat cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Cluster id, starting at 1
    pub id: usize,
    /// Member assets in matrix order
    pub members: Vec<String>,
    /// Mean pairwise correlation among members; 1.0 for a singleton
    pub avg_corr: Option<f64>,
}

/// Output of [`cluster`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    /// Assets in matrix order
    pub assets: Vec<String>,
    /// Full merge tree
    pub dendrogram: Dendrogram,
    /// Cluster id of every asset
    pub assignment: ClusterAssignment,
    /// Clusters ordered by id
    pub clusters: Vec<Cluster>,
}

/// Cut `dendrogram` into at most `k` flat clusters.
///
/// The first `n - k` merges are applied, so exactly `min(k, n)` clusters come
/// out. Returns one id per leaf.
pub fn cut_tree(dendrogram: &Dendrogram, k: usize) -> Vec<usize> {
    let n = dendrogram.leaves();
    let mut labels = vec![0; n];
    let Some(root) = dendrogram.root() else {
        return labels;
    };

    let applied = n - k.clamp(1, n);
    let mut next_id = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match dendrogram.children(node) {
            Some((left, right)) if node - n >= applied => {
                stack.push(right);
                stack.push(left);
            }
            _ => {
                next_id += 1;
                for leaf in dendrogram.leaves_under(node) {
                    labels[leaf] = next_id;
                }
            }
        }
    }

    labels
}

/// Mean of the defined pairwise correlations among `members`.
///
/// A single member yields 1.0; `None` when no pair is defined.
pub fn average_intra_correlation(matrix: &CorrelationMatrix, members: &[usize]) -> Option<f64> {
    if members.len() == 1 {
        return Some(1.0);
    }

    let values: Vec<f64> = matrix
        .select(members)
        .upper_triangle()
        .filter_map(|(_, _, r)| r)
        .collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Cluster the assets of `matrix` into `k` groups.
///
/// # Errors
/// Returns [`StatsError::InvalidParameter`] if `k` is zero, or
/// [`StatsError::InsufficientData`] for fewer than two assets.
pub fn cluster(matrix: &CorrelationMatrix, k: usize) -> Result<ClusterResult> {
    if k == 0 {
        return Err(StatsError::InvalidParameter(
            "cluster count must be at least 1".to_string(),
        ));
    }
    if matrix.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: matrix.len(),
        });
    }

    let distance = DistanceMatrix::from_correlation(matrix);
    let dendrogram = ward_linkage(&distance);
    let labels = cut_tree(&dendrogram, k);

    let cluster_count = labels.iter().copied().max().unwrap_or(0);
    let clusters = (1..=cluster_count)
        .map(|id| {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == id).collect();
            Cluster {
                id,
                members: members.iter().map(|&i| matrix.names()[i].clone()).collect(),
                avg_corr: average_intra_correlation(matrix, &members),
            }
        })
        .collect();

    debug!(
        assets = matrix.len(),
        clusters = cluster_count,
        "clustered correlation matrix"
    );

    Ok(ClusterResult {
        assets: matrix.names().to_vec(),
        dendrogram,
        assignment: ClusterAssignment {
            assets: matrix.names().to_vec(),
            labels,
        },
        clusters,
    })
}
