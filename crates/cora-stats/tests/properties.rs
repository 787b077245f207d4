//! Property checks over random panels.

use chrono::{Days, NaiveDate};
use cora_data::{Panel, PanelColumn, TransformClass};
use cora_stats::{DistanceMatrix, RollingConfig, cluster, correlate, rolling_correlations, top_k};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_panel(rng: &mut StdRng, columns: usize, rows: usize) -> Panel {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let index = (0..rows as u64).map(|i| start + Days::new(i)).collect();
    let columns = (0..columns)
        .map(|c| {
            let values = (0..rows).map(|_| Some(rng.gen_range(-1.0..1.0))).collect();
            PanelColumn::new(format!("x{}", c), TransformClass::Raw, values)
        })
        .collect();
    Panel::new(index, columns).unwrap()
}

#[test]
fn test_matrix_symmetry_and_unit_diagonal() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..10 {
        let panel = random_panel(&mut rng, 6, 50);
        let matrix = correlate(&panel, TransformClass::Raw).unwrap();

        for i in 0..matrix.len() {
            assert!((matrix.get_by_index(i, i).unwrap() - 1.0).abs() < 1e-9);
            for j in 0..matrix.len() {
                let r = matrix.get_by_index(i, j).unwrap();
                assert!((-1.0..=1.0).contains(&r));
                assert_eq!(r, matrix.get_by_index(j, i).unwrap());
            }
        }
    }
}

#[test]
fn test_top_k_is_sorted_by_magnitude() {
    let mut rng = StdRng::seed_from_u64(2);
    let panel = random_panel(&mut rng, 8, 40);
    let matrix = correlate(&panel, TransformClass::Raw).unwrap();

    let pairs = top_k(&matrix, 10);
    assert_eq!(pairs.len(), 10);
    for w in pairs.windows(2) {
        assert!(w[0].correlation.abs() >= w[1].correlation.abs());
    }
    // 8 assets have 28 pairs
    assert_eq!(top_k(&matrix, 100).len(), 28);
}

#[test]
fn test_clusters_partition_assets_for_every_k() {
    let mut rng = StdRng::seed_from_u64(3);
    let panel = random_panel(&mut rng, 7, 60);
    let matrix = correlate(&panel, TransformClass::Raw).unwrap();

    let distances = DistanceMatrix::from_correlation(&matrix);
    for i in 0..distances.len() {
        assert_eq!(distances.get(i, i), Some(0.0));
        for j in 0..distances.len() {
            let d = distances.get(i, j).unwrap();
            assert!((0.0..=1.0).contains(&d));
        }
    }

    for k in 1..=7 {
        let result = cluster(&matrix, k).unwrap();
        assert_eq!(result.clusters.len(), k);
        assert!(result.dendrogram.is_monotonic());

        let mut members: Vec<&str> = result
            .clusters
            .iter()
            .flat_map(|c| c.members.iter().map(String::as_str))
            .collect();
        members.sort_unstable();
        let mut names: Vec<&str> = matrix.names().iter().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(members, names);
    }
}

#[test]
fn test_rolling_samples_start_after_first_full_window() {
    let mut rng = StdRng::seed_from_u64(4);
    let panel = random_panel(&mut rng, 3, 400);
    let config = RollingConfig::default();

    let pairs = rolling_correlations(&panel, &["x0", "x1", "x2"], &config).unwrap();
    assert_eq!(pairs.len(), 3);

    for pair in &pairs {
        for window in &pair.windows {
            let first_full = panel.index()[window.size - 1];
            assert!(window.samples.iter().all(|s| s.date >= first_full));
            assert!(window.samples.iter().all(|s| (-1.0..=1.0).contains(&s.corr)));
        }
        assert!(pair.current.is_some());
    }
}
