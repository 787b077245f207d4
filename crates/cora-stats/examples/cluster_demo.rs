//! Correlation, ranking and clustering on a synthetic cross-asset panel.
//!
//! Three latent drivers generate nine assets; Ward clustering on the raw
//! correlation matrix should recover the three groups.

use chrono::{Days, NaiveDate};
use cora_data::{Panel, PanelColumn, TransformClass};
use cora_stats::{DistanceMatrix, cluster, correlate, top_k};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 250;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("==========================================================");
    println!("            CORA Correlation & Clustering Demo");
    println!("==========================================================\n");

    let mut rng = StdRng::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).ok_or("invalid date")?;
    let index: Vec<NaiveDate> = (0..ROWS as u64)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .collect();

    let drivers: Vec<Vec<f64>> = (0..3)
        .map(|_| random_walk(&mut rng))
        .collect();

    let groups = [
        ("equities", ["spx", "ndx", "dax"]),
        ("metals", ["gold", "silver", "platinum"]),
        ("rates", ["ust10", "bund10", "gilt10"]),
    ];

    let mut columns = Vec::new();
    for ((_, names), driver) in groups.iter().zip(&drivers) {
        for name in names {
            let values = driver
                .iter()
                .map(|d| Some(d + rng.gen_range(-0.5..0.5)))
                .collect();
            columns.push(PanelColumn::new(*name, TransformClass::Raw, values));
        }
    }
    let panel = Panel::new(index, columns)?;

    let matrix = correlate(&panel, TransformClass::Raw).ok_or("not enough columns")?;

    println!("Strongest pairs:");
    for pair in top_k(&matrix, 5) {
        println!("  {:<10} {:<10} {:>8.4}", pair.asset_a, pair.asset_b, pair.correlation);
    }

    let distances = DistanceMatrix::from_correlation(&matrix);
    println!("\nCondensed distances: {} entries", distances.condensed().len());

    let result = cluster(&matrix, 3)?;
    println!("\nWard clusters (k = 3):");
    for c in &result.clusters {
        let avg = c.avg_corr.map_or_else(|| "-".to_string(), |r| format!("{:.3}", r));
        println!("  {}: {} (avg corr {})", c.id, c.members.join(", "), avg);
    }

    println!("\nMerge steps:");
    for step in result.dendrogram.steps() {
        println!(
            "  {:>2} + {:>2} at {:.4} (size {})",
            step.node_a, step.node_b, step.distance, step.size
        );
    }

    Ok(())
}

fn random_walk(rng: &mut StdRng) -> Vec<f64> {
    let mut level = 0.0;
    (0..ROWS)
        .map(|_| {
            level += rng.gen_range(-1.0..1.0);
            level
        })
        .collect()
}
