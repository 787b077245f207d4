#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cora-analytics/cora/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod pipeline;

// Re-export main types from sub-crates
pub use cora_data as data;
pub use cora_output as output;
pub use cora_stats as stats;

pub use config::{
    ClusteringConfig, ColumnConfig, ConfigError, CoraConfig, Derivation, PipelineConfig,
    SourceConfig,
};
pub use pipeline::{
    PipelineError, PipelineOutput, RollingOutput, run_pipeline, run_pipelines, within_source,
    within_sources,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
