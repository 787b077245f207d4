//! Writes pipeline results to an output directory.

use crate::export::{DEFAULT_PRECISION, ExportError, ExportFormat, Exporter};
use crate::records::{
    ClusterExport, HeatmapExport, MatrixExport, PairExport, PanelExport, RollingExport,
    WithinDatasetExport,
};
use cora_data::{Panel, TransformClass};
use cora_stats::{ClusterResult, CorrelationMatrix, CorrelationPair, RollingPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output directory, created on demand
    pub out_dir: PathBuf,

    /// Decimal places for statistics (default: 4)
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Pretty-print JSON files
    #[serde(default)]
    pub pretty: bool,
}

impl ExportConfig {
    /// Compact JSON with the default precision under `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            precision: DEFAULT_PRECISION,
            pretty: false,
        }
    }

    /// Set pretty-printing.
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    const fn json_format(&self) -> ExportFormat {
        if self.pretty {
            ExportFormat::PrettyJson
        } else {
            ExportFormat::Json
        }
    }
}

/// Writes result files named after their pipeline and transform class.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    config: ExportConfig,
}

impl OutputWriter {
    /// Create a writer, creating the output directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        fs::create_dir_all(&config.out_dir)?;
        Ok(Self { config })
    }

    /// Writer configuration.
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.config.out_dir.join(file_name)
    }

    fn write<E: Exporter>(
        &self,
        record: &E,
        file_name: &str,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        let path = self.path(file_name);
        record.export_to_file(&path, format)?;
        info!(path = %path.display(), "wrote output");
        Ok(path)
    }

    /// Write `merged_{name}.csv`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_merged(&self, name: &str, panel: &Panel) -> Result<PathBuf, ExportError> {
        self.write(
            &PanelExport::from_panel(panel),
            &format!("merged_{}.csv", name),
            ExportFormat::Csv,
        )
    }

    /// Write `corr_{name}_{class}.csv` and `heatmap_{name}_{class}.json`.
    ///
    /// # Errors
    /// Returns an error if either file cannot be written.
    pub fn write_correlation(
        &self,
        name: &str,
        class: TransformClass,
        matrix: &CorrelationMatrix,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let label = format!("{}_{}", name, class.label());
        let precision = self.config.precision;

        let csv = self.write(
            &MatrixExport::from_matrix(matrix, precision),
            &format!("corr_{}.csv", label),
            ExportFormat::Csv,
        )?;
        let heatmap = self.write(
            &HeatmapExport::from_matrix(matrix, label.clone(), precision),
            &format!("heatmap_{}.json", label),
            self.config.json_format(),
        )?;
        Ok(vec![csv, heatmap])
    }

    /// Write `top_pairs_{name}_{class}.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_top_pairs(
        &self,
        name: &str,
        class: TransformClass,
        pairs: &[CorrelationPair],
    ) -> Result<PathBuf, ExportError> {
        self.write(
            &PairExport::from_pairs(pairs, self.config.precision),
            &format!("top_pairs_{}_{}.json", name, class.label()),
            self.config.json_format(),
        )
    }

    /// Write `rolling_{name}.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_rolling(
        &self,
        name: &str,
        assets: Vec<String>,
        pairs: &[RollingPair],
    ) -> Result<PathBuf, ExportError> {
        self.write(
            &RollingExport::new(assets, pairs, self.config.precision),
            &format!("rolling_{}.json", name),
            self.config.json_format(),
        )
    }

    /// Write `clusters_{name}.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_clusters(
        &self,
        name: &str,
        result: &ClusterResult,
    ) -> Result<PathBuf, ExportError> {
        self.write(
            &ClusterExport::from_result(result, self.config.precision),
            &format!("clusters_{}.json", name),
            self.config.json_format(),
        )
    }

    /// Write `within_dataset_correlations.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_within_dataset(
        &self,
        matrices: &BTreeMap<String, CorrelationMatrix>,
    ) -> Result<PathBuf, ExportError> {
        self.write(
            &WithinDatasetExport::from_matrices(matrices, self.config.precision),
            "within_dataset_correlations.json",
            self.config.json_format(),
        )
    }

    /// Whether `file_name` exists in the output directory.
    pub fn exists(&self, file_name: &str) -> bool {
        self.path(file_name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> CorrelationMatrix {
        CorrelationMatrix::new(
            vec!["a".to_string(), "b".to_string()],
            array![[1.0, -0.5], [-0.5, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_writer_creates_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("out");
        let writer = OutputWriter::new(ExportConfig::new(&out_dir)).unwrap();

        let paths = writer
            .write_correlation("monthly", TransformClass::LogReturn, &matrix())
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(writer.exists("corr_monthly_log_returns.csv"));
        assert!(writer.exists("heatmap_monthly_log_returns.json"));

        let heatmap = fs::read_to_string(out_dir.join("heatmap_monthly_log_returns.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&heatmap).unwrap();
        assert_eq!(value["label"], "monthly_log_returns");
        assert_eq!(value["matrix"][0][1], -0.5);
    }

    #[test]
    fn test_within_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            OutputWriter::new(ExportConfig::new(dir.path()).with_pretty(true)).unwrap();

        let mut matrices = BTreeMap::new();
        matrices.insert("rates".to_string(), matrix());
        let path = writer.write_within_dataset(&matrices).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("\"rates\""));
        assert!(text.contains('\n'));
    }
}
