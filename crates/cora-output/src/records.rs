//! Serializable output records.
//!
//! Records are built from engine results, rounding statistics to the
//! requested precision. Undefined values stay `None` and serialize as JSON
//! `null` or an empty CSV cell.

use crate::export::{
    ExportError, ExportFormat, Exporter, cell, finish_csv, round_opt, round_to, to_json,
};
use chrono::NaiveDate;
use cora_data::Panel;
use cora_stats::{ClusterResult, CorrelationMatrix, CorrelationPair, RollingPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn matrix_rows(matrix: &CorrelationMatrix, precision: u32) -> Vec<Vec<Option<f64>>> {
    matrix
        .to_rows()
        .into_iter()
        .map(|row| row.into_iter().map(|v| round_opt(v, precision)).collect())
        .collect()
}

fn matrix_csv(assets: &[String], matrix: &[Vec<Option<f64>>]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let header: Vec<&str> = std::iter::once("")
        .chain(assets.iter().map(String::as_str))
        .collect();
    wtr.write_record(&header)?;
    for (asset, row) in assets.iter().zip(matrix) {
        let record: Vec<String> = std::iter::once(asset.clone())
            .chain(row.iter().map(|v| cell(*v)))
            .collect();
        wtr.write_record(&record)?;
    }
    finish_csv(wtr)
}

/// A labelled correlation matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixExport {
    /// Asset names in row/column order.
    pub assets: Vec<String>,

    /// Rows of correlations; `None` where undefined.
    pub matrix: Vec<Vec<Option<f64>>>,
}

impl MatrixExport {
    /// Build from a correlation matrix.
    pub fn from_matrix(matrix: &CorrelationMatrix, precision: u32) -> Self {
        Self {
            assets: matrix.names().to_vec(),
            matrix: matrix_rows(matrix, precision),
        }
    }
}

impl Exporter for MatrixExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => matrix_csv(&self.assets, &self.matrix),
            _ => to_json(self, format),
        }
    }
}

/// Heatmap payload: a matrix plus the `{pipeline}_{class}` label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatmapExport {
    /// Asset names in row/column order.
    pub assets: Vec<String>,

    /// Rows of correlations; `None` where undefined.
    pub matrix: Vec<Vec<Option<f64>>>,

    /// Heatmap label, e.g. `daily_raw`.
    pub label: String,
}

impl HeatmapExport {
    /// Build from a correlation matrix.
    pub fn from_matrix(matrix: &CorrelationMatrix, label: impl Into<String>, precision: u32) -> Self {
        Self {
            assets: matrix.names().to_vec(),
            matrix: matrix_rows(matrix, precision),
            label: label.into(),
        }
    }
}

impl Exporter for HeatmapExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => matrix_csv(&self.assets, &self.matrix),
            _ => to_json(self, format),
        }
    }
}

/// One ranked pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairExport {
    /// Row asset.
    pub asset_a: String,

    /// Column asset.
    pub asset_b: String,

    /// Rounded correlation.
    pub correlation: f64,
}

impl PairExport {
    /// Build records from ranked pairs, skipping non-finite values.
    pub fn from_pairs(pairs: &[CorrelationPair], precision: u32) -> Vec<Self> {
        pairs
            .iter()
            .filter_map(|p| {
                Some(Self {
                    asset_a: p.asset_a.clone(),
                    asset_b: p.asset_b.clone(),
                    correlation: round_to(p.correlation, precision)?,
                })
            })
            .collect()
    }
}

impl Exporter for Vec<PairExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                finish_csv(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

/// A dated rolling correlation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RollingPointExport {
    /// Bucket date.
    pub date: NaiveDate,

    /// Rounded correlation.
    pub corr: f64,
}

/// Rolling correlations of one pair, keyed by window label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingPairExport {
    /// Display label, `a / b`.
    pub pair: String,

    /// First asset.
    pub a: String,

    /// Second asset.
    pub b: String,

    /// Samples per window label.
    pub windows: BTreeMap<String, Vec<RollingPointExport>>,

    /// Correlation over the most recent rows.
    pub current: Option<f64>,
}

/// Rolling correlation payload for one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingExport {
    /// Columns the pairs were drawn from.
    pub assets: Vec<String>,

    /// One entry per pair.
    pub pairs: Vec<RollingPairExport>,
}

impl RollingExport {
    /// Build from rolling results.
    pub fn new(assets: Vec<String>, pairs: &[RollingPair], precision: u32) -> Self {
        let pairs = pairs
            .iter()
            .map(|pair| RollingPairExport {
                pair: pair.label(),
                a: pair.a.clone(),
                b: pair.b.clone(),
                windows: pair
                    .windows
                    .iter()
                    .map(|window| {
                        let points = window
                            .samples
                            .iter()
                            .filter_map(|s| {
                                Some(RollingPointExport {
                                    date: s.date,
                                    corr: round_to(s.corr, precision)?,
                                })
                            })
                            .collect();
                        (window.label.clone(), points)
                    })
                    .collect(),
                current: round_opt(pair.current, precision),
            })
            .collect();

        Self { assets, pairs }
    }
}

#[derive(Debug, Serialize)]
struct RollingRow<'a> {
    pair: &'a str,
    window: &'a str,
    date: NaiveDate,
    corr: f64,
}

impl Exporter for RollingExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for pair in &self.pairs {
                    for (window, points) in &pair.windows {
                        for point in points {
                            wtr.serialize(RollingRow {
                                pair: &pair.pair,
                                window,
                                date: point.date,
                                corr: point.corr,
                            })?;
                        }
                    }
                }
                finish_csv(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

/// One flat cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterRecord {
    /// Cluster id, starting at 1.
    pub id: usize,

    /// Member assets.
    pub members: Vec<String>,

    /// Average intra-cluster correlation.
    pub avg_corr: Option<f64>,
}

/// Dendrogram in linkage-matrix columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DendrogramExport {
    /// Merged node pairs.
    pub merge: Vec<[usize; 2]>,

    /// Merge distances.
    pub distances: Vec<f64>,

    /// Leaves under each new node.
    pub counts: Vec<usize>,
}

/// Clustering payload for one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterExport {
    /// Assets in matrix order.
    pub assets: Vec<String>,

    /// Clusters ordered by id.
    pub clusters: Vec<ClusterRecord>,

    /// Full merge tree.
    pub dendrogram: DendrogramExport,
}

impl ClusterExport {
    /// Build from a clustering result.
    pub fn from_result(result: &ClusterResult, precision: u32) -> Self {
        let steps = result.dendrogram.steps();
        Self {
            assets: result.assets.clone(),
            clusters: result
                .clusters
                .iter()
                .map(|c| ClusterRecord {
                    id: c.id,
                    members: c.members.clone(),
                    avg_corr: round_opt(c.avg_corr, precision),
                })
                .collect(),
            dendrogram: DendrogramExport {
                merge: steps.iter().map(|s| [s.node_a, s.node_b]).collect(),
                distances: steps
                    .iter()
                    .map(|s| round_to(s.distance, precision).unwrap_or(s.distance))
                    .collect(),
                counts: steps.iter().map(|s| s.size).collect(),
            },
        }
    }
}

impl Exporter for ClusterExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["asset", "cluster"])?;
                for cluster in &self.clusters {
                    let id = cluster.id.to_string();
                    for member in &cluster.members {
                        wtr.write_record([member.as_str(), id.as_str()])?;
                    }
                }
                finish_csv(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

/// Within-source matrices keyed by source name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct WithinDatasetExport(pub BTreeMap<String, MatrixExport>);

impl WithinDatasetExport {
    /// Build from per-source matrices.
    pub fn from_matrices(matrices: &BTreeMap<String, CorrelationMatrix>, precision: u32) -> Self {
        Self(
            matrices
                .iter()
                .map(|(name, m)| (name.clone(), MatrixExport::from_matrix(m, precision)))
                .collect(),
        )
    }
}

impl Exporter for WithinDatasetExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "within-dataset matrices have no CSV form".to_string(),
            )),
            _ => to_json(self, format),
        }
    }
}

/// One panel column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelColumnExport {
    /// Column name.
    pub name: String,

    /// Transform class label.
    pub class: String,

    /// Values aligned to the dates.
    pub values: Vec<Option<f64>>,
}

/// A merged panel, values unrounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelExport {
    /// Row dates.
    pub dates: Vec<NaiveDate>,

    /// Columns in panel order.
    pub columns: Vec<PanelColumnExport>,
}

impl PanelExport {
    /// Build from a panel.
    pub fn from_panel(panel: &Panel) -> Self {
        Self {
            dates: panel.index().to_vec(),
            columns: panel
                .columns()
                .iter()
                .map(|c| PanelColumnExport {
                    name: c.name().to_string(),
                    class: c.class().label().to_string(),
                    values: c.values().to_vec(),
                })
                .collect(),
        }
    }
}

impl Exporter for PanelExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let header: Vec<&str> = std::iter::once("date")
                    .chain(self.columns.iter().map(|c| c.name.as_str()))
                    .collect();
                wtr.write_record(&header)?;
                for (row, date) in self.dates.iter().enumerate() {
                    let record: Vec<String> = std::iter::once(date.to_string())
                        .chain(self.columns.iter().map(|c| cell(c.values[row])))
                        .collect();
                    wtr.write_record(&record)?;
                }
                finish_csv(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cora_data::{PanelColumn, TransformClass};
    use cora_stats::{RollingSample, WindowSeries, cluster, top_k};
    use ndarray::array;

    fn matrix() -> CorrelationMatrix {
        CorrelationMatrix::new(
            vec!["gold".to_string(), "oil".to_string(), "flat".to_string()],
            array![
                [1.0, 0.123456, f64::NAN],
                [0.123456, 1.0, f64::NAN],
                [f64::NAN, f64::NAN, f64::NAN]
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_heatmap_json_writes_null() {
        let heatmap = HeatmapExport::from_matrix(&matrix(), "daily_raw", 4);
        let json = heatmap.export_to_string(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["label"], "daily_raw");
        assert_eq!(value["assets"][2], "flat");
        assert_eq!(value["matrix"][0][1], 0.1235);
        assert!(value["matrix"][0][2].is_null());
        assert!(value["matrix"][2][2].is_null());
    }

    #[test]
    fn test_matrix_csv() {
        let csv = MatrixExport::from_matrix(&matrix(), 4)
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], ",gold,oil,flat");
        assert_eq!(lines[1], "gold,1,0.1235,");
        assert_eq!(lines[3], "flat,,,");
    }

    #[test]
    fn test_pairs_export() {
        let pairs = PairExport::from_pairs(&top_k(&matrix(), 5), 2);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].correlation, 0.12);

        let csv = pairs.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("asset_a,asset_b,correlation"));
        assert!(csv.contains("gold,oil,0.12"));
    }

    #[test]
    fn test_rolling_export() {
        let pair = RollingPair {
            a: "spx".to_string(),
            b: "gold".to_string(),
            windows: vec![WindowSeries {
                label: "30D".to_string(),
                size: 30,
                samples: vec![RollingSample {
                    date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
                    corr: 0.333333,
                }],
            }],
            current: None,
        };
        let export = RollingExport::new(vec!["spx".to_string(), "gold".to_string()], &[pair], 4);
        let value: serde_json::Value =
            serde_json::from_str(&export.export_to_string(ExportFormat::Json).unwrap()).unwrap();

        assert_eq!(value["pairs"][0]["pair"], "spx / gold");
        assert_eq!(value["pairs"][0]["windows"]["30D"][0]["date"], "2024-01-07");
        assert_eq!(value["pairs"][0]["windows"]["30D"][0]["corr"], 0.3333);
        assert!(value["pairs"][0]["current"].is_null());

        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.contains("spx / gold,30D,2024-01-07,0.3333"));
    }

    #[test]
    fn test_cluster_export() {
        let m = CorrelationMatrix::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            array![[1.0, 0.9, 0.1], [0.9, 1.0, 0.2], [0.1, 0.2, 1.0]],
        )
        .unwrap();
        let export = ClusterExport::from_result(&cluster(&m, 2).unwrap(), 4);

        assert_eq!(export.clusters.len(), 2);
        assert_eq!(export.dendrogram.merge, vec![[0, 1], [2, 3]]);
        assert_eq!(export.dendrogram.counts, vec![2, 3]);
        assert_eq!(export.dendrogram.distances[0], 0.1);

        let json = export.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\"avg_corr\""));
        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("asset,cluster"));
    }

    #[test]
    fn test_within_dataset_is_keyed_by_source() {
        let mut matrices = BTreeMap::new();
        matrices.insert("metals".to_string(), matrix());
        let export = WithinDatasetExport::from_matrices(&matrices, 4);

        let value: serde_json::Value =
            serde_json::from_str(&export.export_to_string(ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(value["metals"]["assets"][0], "gold");
        assert!(matches!(
            export.export_to_string(ExportFormat::Csv),
            Err(ExportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_panel_csv() {
        let panel = Panel::new(
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ],
            vec![
                PanelColumn::new("a", TransformClass::Raw, vec![Some(1.5), None]),
                PanelColumn::new("log_a", TransformClass::LogLevel, vec![Some(0.4), Some(0.5)]),
            ],
        )
        .unwrap();

        let export = PanelExport::from_panel(&panel);
        assert_eq!(export.columns[1].class, "log");

        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "date,a,log_a\n2024-01-01,1.5,0.4\n2024-01-02,,0.5\n");
    }
}
