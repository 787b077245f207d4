//! Agglomerative Ward linkage.
//!
//! Clusters are merged greedily by smallest distance; distances to a merged
//! cluster follow the Lance-Williams recurrence for Ward's criterion. Node ids
//! use the usual convention: leaves are `0..n` and merge step `i` creates node
//! `n + i`.

use super::distance::DistanceMatrix;

/// One merge in a [`Dendrogram`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    /// Smaller node id of the merged pair
    pub node_a: usize,
    /// Larger node id of the merged pair
    pub node_b: usize,
    /// Linkage distance of the merge
    pub distance: f64,
    /// Number of leaves under the new node
    pub size: usize,
}

/// Ordered record of merges over `leaves` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    leaves: usize,
    steps: Vec<MergeStep>,
}

impl Dendrogram {
    /// Number of leaves.
    pub const fn leaves(&self) -> usize {
        self.leaves
    }

    /// Merge steps in order.
    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// Id of the root node, if there is at least one leaf.
    pub const fn root(&self) -> Option<usize> {
        match self.leaves {
            0 => None,
            n => Some(2 * n - 2),
        }
    }

    /// Children of an internal node.
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        let step = self.steps.get(node.checked_sub(self.leaves)?)?;
        Some((step.node_a, step.node_b))
    }

    /// Whether merge distances never decrease.
    pub fn is_monotonic(&self) -> bool {
        self.steps.windows(2).all(|w| w[0].distance <= w[1].distance)
    }

    /// Leaves under `node`, left to right.
    pub fn leaves_under(&self, node: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match self.children(current) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => leaves.push(current),
            }
        }
        leaves
    }
}

/// Disjoint sets over the `2n - 1` dendrogram nodes.
struct LinkageUnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_label: usize,
}

impl LinkageUnionFind {
    fn new(n: usize) -> Self {
        let nodes = (2 * n).saturating_sub(1);
        let mut size = vec![0; nodes];
        size[..n].fill(1);
        Self {
            parent: (0..nodes).collect(),
            size,
            next_label: n,
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// Join two roots under a fresh node and return its size.
    fn merge(&mut self, x: usize, y: usize) -> usize {
        let label = self.next_label;
        self.parent[x] = label;
        self.parent[y] = label;
        self.size[label] = self.size[x] + self.size[y];
        self.next_label += 1;
        self.size[label]
    }
}

/// Ward linkage over a distance matrix.
pub fn ward_linkage(distance: &DistanceMatrix) -> Dendrogram {
    let n = distance.len();
    let mut d = distance.values().clone();
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];

    // Merges recorded by representative leaf, relabelled below
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n.saturating_sub(1));

    for _ in 1..n {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let dij = d[[i, j]];
                if best.is_none_or(|(_, _, b)| dij < b) {
                    best = Some((i, j, dij));
                }
            }
        }
        let Some((i, j, dij)) = best else {
            break;
        };
        raw.push((i, j, dij));

        let ni = size[i] as f64;
        let nj = size[j] as f64;
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let nk = size[k] as f64;
            let dki = d[[k, i]];
            let dkj = d[[k, j]];
            let updated = ((ni + nk) * dki * dki + (nj + nk) * dkj * dkj - nk * dij * dij)
                / (ni + nj + nk);
            let updated = updated.max(0.0).sqrt();
            d[[i, k]] = updated;
            d[[k, i]] = updated;
        }

        size[i] += size[j];
        active[j] = false;
    }

    raw.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut uf = LinkageUnionFind::new(n);
    let steps = raw
        .into_iter()
        .map(|(x, y, distance)| {
            let x_root = uf.find(x);
            let y_root = uf.find(y);
            let size = uf.merge(x_root, y_root);
            MergeStep {
                node_a: x_root.min(y_root),
                node_b: x_root.max(y_root),
                distance,
                size,
            }
        })
        .collect();

    Dendrogram { leaves: n, steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationMatrix;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn distance(corr: Array2<f64>) -> DistanceMatrix {
        let names = (0..corr.nrows()).map(|i| format!("x{}", i)).collect();
        DistanceMatrix::from_correlation(&CorrelationMatrix::new(names, corr).unwrap())
    }

    #[test]
    fn test_ward_four_points() {
        // Two tight pairs far from each other
        let dist = distance(array![
            [1.0, 0.9, 0.1, 0.0],
            [0.9, 1.0, 0.0, 0.1],
            [0.1, 0.0, 1.0, 0.8],
            [0.0, 0.1, 0.8, 1.0],
        ]);
        let tree = ward_linkage(&dist);

        assert_eq!(tree.leaves(), 4);
        assert_eq!(tree.steps().len(), 3);

        let first = tree.steps()[0];
        assert_eq!((first.node_a, first.node_b, first.size), (0, 1, 2));
        assert_abs_diff_eq!(first.distance, 0.1, epsilon = 1e-12);

        let second = tree.steps()[1];
        assert_eq!((second.node_a, second.node_b, second.size), (2, 3, 2));
        assert_abs_diff_eq!(second.distance, 0.2, epsilon = 1e-12);

        let root = tree.steps()[2];
        assert_eq!((root.node_a, root.node_b, root.size), (4, 5, 4));
        // Every cross distance is at least 0.9
        assert!(root.distance > 0.9);

        assert_eq!(tree.root(), Some(6));
        assert_eq!(tree.children(6), Some((4, 5)));
        assert_eq!(tree.leaves_under(6), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ward_three_point_update() {
        // d(0,1) = 0.2, d(0,2) = 0.6, d(1,2) = 0.8
        let dist = distance(array![[1.0, 0.8, 0.4], [0.8, 1.0, 0.2], [0.4, 0.2, 1.0]]);
        let tree = ward_linkage(&dist);

        let expected = ((2.0 * 0.36 + 2.0 * 0.64 - 0.04) / 3.0_f64).sqrt();
        assert_abs_diff_eq!(tree.steps()[1].distance, expected, epsilon = 1e-12);
        assert_eq!((tree.steps()[1].node_a, tree.steps()[1].node_b), (2, 3));
    }

    #[test]
    fn test_ties_take_lowest_pair() {
        let dist = distance(array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5], [0.5, 0.5, 1.0]]);
        let tree = ward_linkage(&dist);
        assert_eq!((tree.steps()[0].node_a, tree.steps()[0].node_b), (0, 1));
    }

    #[test]
    fn test_random_trees_are_monotonic() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in 2..12 {
            let mut corr = Array2::<f64>::eye(n);
            for i in 0..n {
                for j in (i + 1)..n {
                    let r = rng.gen_range(-1.0..1.0);
                    corr[[i, j]] = r;
                    corr[[j, i]] = r;
                }
            }
            let tree = ward_linkage(&distance(corr));

            assert_eq!(tree.steps().len(), n - 1);
            assert!(tree.is_monotonic());
            assert_eq!(tree.steps().last().unwrap().size, n);
            for (i, step) in tree.steps().iter().enumerate() {
                assert!(step.node_a < step.node_b);
                assert!(step.node_b < n + i);
            }
        }
    }

    #[test]
    fn test_single_leaf() {
        let tree = ward_linkage(&distance(array![[1.0]]));
        assert!(tree.steps().is_empty());
        assert_eq!(tree.root(), Some(0));
        assert_eq!(tree.leaves_under(0), vec![0]);
    }
}
