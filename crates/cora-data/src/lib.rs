#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cora-analytics/cora/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod frequency;
pub mod merge;
pub mod normalize;
pub mod panel;
pub mod series;
pub mod table;

pub use error::{DataError, Result};
pub use frame::DATE_COLUMN;
pub use frequency::{Frequency, ResamplePolicy};
pub use merge::{GapFill, merge, outer_join};
pub use normalize::normalize;
pub use panel::{Panel, PanelColumn};
pub use series::{Series, TransformClass};
pub use table::{ColumnSpec, CsvTableLoader, SourceTable, TableLoader, TableSpec, parse_date};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
