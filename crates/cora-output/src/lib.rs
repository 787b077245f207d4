#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cora-analytics/cora/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod records;
pub mod summary;
pub mod writer;

pub use export::{DEFAULT_PRECISION, ExportError, ExportFormat, Exporter, round_opt, round_to};
pub use records::{
    ClusterExport, ClusterRecord, DendrogramExport, HeatmapExport, MatrixExport, PairExport,
    PanelColumnExport, PanelExport, RollingExport, RollingPairExport, RollingPointExport,
    WithinDatasetExport,
};
pub use summary::{ClassSummary, PipelineSummary};
pub use writer::{ExportConfig, OutputWriter};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
