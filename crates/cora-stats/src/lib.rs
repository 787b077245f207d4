#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cora-analytics/cora/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cluster;
pub mod correlation;
pub mod error;
pub mod ranking;
pub mod rolling;

// Re-export main types
pub use cluster::{
    Cluster, ClusterAssignment, ClusterResult, Dendrogram, DistanceMatrix, MergeStep, cluster,
};
pub use correlation::{
    CorrelationMatrix, correlate, correlate_by_class, correlate_columns, pearson,
};
pub use error::{Result, StatsError};
pub use ranking::{CorrelationPair, top_k};
pub use rolling::{
    Downsample, RollingConfig, RollingPair, RollingSample, RollingWindow, WindowSeries,
    rolling_correlations,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
