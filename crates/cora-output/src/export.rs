//! Export formats and the [`Exporter`] trait.
//!
//! Every output record can render itself as CSV or JSON. Numbers are rounded
//! when records are built, so both formats agree on the written values.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Decimal places used for exported statistics.
pub const DEFAULT_PRECISION: u32 = 4;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the format is unsupported.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Round `value` to `decimals` places; non-finite values become `None`.
pub fn round_to(value: f64, decimals: u32) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let scale = 10f64.powi(decimals as i32);
    Some((value * scale).round() / scale)
}

/// Round an optional value, keeping `None` for undefined entries.
pub fn round_opt(value: Option<f64>, decimals: u32) -> Option<f64> {
    value.and_then(|v| round_to(v, decimals))
}

/// Text of a CSV cell for an optional number; undefined is empty.
pub(crate) fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize a JSON record in the compact or pretty form.
pub(crate) fn to_json<T: serde::Serialize>(
    value: &T,
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string(value)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        ExportFormat::Csv => Err(ExportError::InvalidFormat(
            "record has no JSON form for CSV".to_string(),
        )),
    }
}

/// Finish a CSV writer and return its contents.
pub(crate) fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.123456, 4, Some(0.1235))]
    #[case(0.00004, 4, Some(0.0))]
    #[case(1.0, 4, Some(1.0))]
    #[case(0.5, 0, Some(1.0))]
    #[case(f64::NAN, 4, None)]
    #[case(f64::INFINITY, 4, None)]
    fn test_round_to(#[case] value: f64, #[case] decimals: u32, #[case] expected: Option<f64>) {
        assert_eq!(round_to(value, decimals), expected);
    }

    #[test]
    fn test_cell() {
        assert_eq!(cell(Some(0.25)), "0.25");
        assert_eq!(cell(None), "");
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
