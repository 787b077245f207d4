//! Error types for the statistics engines.

use thiserror::Error;

/// Result type for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur while computing statistics.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Insufficient data for the computation
    #[error("Insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Required number of observations or assets
        required: usize,
        /// Actual number available
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Column not present in the panel
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
