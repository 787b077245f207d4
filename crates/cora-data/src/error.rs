//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Timestamps are not strictly increasing
    #[error("Series {series} is not strictly increasing at {date}")]
    UnsortedIndex {
        /// Series name
        series: String,
        /// First offending timestamp
        date: String,
    },

    /// Column name already present in a panel
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Column length does not match the panel index
    #[error("Column {column} has {actual} values, index has {expected}")]
    LengthMismatch {
        /// Column name
        column: String,
        /// Index length
        expected: usize,
        /// Column length
        actual: usize,
    },

    /// Resampling policy cannot move a series onto the requested grid
    #[error("Policy {policy} cannot resample {series} from {from} to {to}")]
    InvalidPolicy {
        /// Series name
        series: String,
        /// Policy name
        policy: String,
        /// Native frequency
        from: String,
        /// Target frequency
        to: String,
    },

    /// Column not present in a table
    #[error("Missing column {column} in {source_name}")]
    MissingColumn {
        /// Source table
        source_name: String,
        /// Column name
        column: String,
    },

    /// Source table could not be read or is empty
    #[error("Missing data for {source_name}: {reason}")]
    MissingData {
        /// Source table
        source_name: String,
        /// Reason for missing data
        reason: String,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
