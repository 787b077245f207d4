//! Demonstration of the export records in cora-output.

use chrono::{Days, NaiveDate};
use cora_data::{Panel, PanelColumn, TransformClass};
use cora_output::{ExportFormat, Exporter, HeatmapExport, PairExport, PanelExport};
use cora_stats::{correlate, top_k};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== CORA Export Demo ===\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid date")?;
    let index: Vec<NaiveDate> = (0..8)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .collect();
    let column = |name: &str, f: fn(f64) -> f64| {
        let values = (0..8).map(|t| Some(f(f64::from(t)))).collect();
        PanelColumn::new(name, TransformClass::Raw, values)
    };

    let columns = vec![
        column("gold", |t| 1900.0 + 4.0 * t),
        column("silver", |t| 23.0 + 0.1 * t + (t * 1.3).sin()),
        column("dxy", |t| 104.0 - 0.2 * t),
        column("vix", |t| 14.0 + (t * 0.7).cos()),
    ];
    let panel = Panel::new(index, columns)?;

    // 1. Merged panel
    println!("1. Merged Panel\n");
    println!("{}\n", PanelExport::from_panel(&panel).export_to_string(ExportFormat::Csv)?);

    // 2. Heatmap
    println!("2. Heatmap\n");
    let matrix = correlate(&panel, TransformClass::Raw).ok_or("not enough columns")?;
    let heatmap = HeatmapExport::from_matrix(&matrix, "demo_raw", 3);
    println!("{}\n", heatmap.export_to_string(ExportFormat::PrettyJson)?);

    // 3. Top pairs
    println!("3. Top Pairs\n");
    let pairs = PairExport::from_pairs(&top_k(&matrix, 3), 3);
    println!("CSV Format:");
    println!("{}", pairs.export_to_string(ExportFormat::Csv)?);
    println!("JSON Format:");
    println!("{}\n", pairs.export_to_string(ExportFormat::Json)?);

    println!("=== Demo Complete ===");
    Ok(())
}
