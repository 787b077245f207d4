//! Clean per-source tables and how they are loaded.
//!
//! A source table is one timestamp column plus numeric columns, sorted and
//! free of duplicate dates. Each numeric column carries its native frequency
//! and transform class. Loading is behind [`TableLoader`] so the pipeline does
//! not care where tables come from; [`CsvTableLoader`] reads them from disk.

use crate::error::{DataError, Result};
use crate::frequency::Frequency;
use crate::panel::Panel;
use crate::series::{Series, TransformClass};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Cell contents read as a missing value.
const MISSING_MARKERS: &[&str] = &["", ".", "nan", "na", "n/a", "null", "none"];

fn default_date_column() -> String {
    "date".to_string()
}

/// Metadata for one numeric column of a source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header of the column in the source
    pub name: String,
    /// Name the column takes in panels (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Native frequency of the column
    pub frequency: Frequency,
    /// Transform class of the column (default: raw)
    #[serde(default)]
    pub class: TransformClass,
}

impl ColumnSpec {
    /// Raw column with no rename.
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            rename: None,
            frequency,
            class: TransformClass::Raw,
        }
    }

    /// Set the transform class.
    pub const fn with_class(mut self, class: TransformClass) -> Self {
        self.class = class;
        self
    }

    /// Set the output name.
    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    /// Name the column takes once loaded.
    pub fn output_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

/// Where a source table lives and which of its columns to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Source name used in logs and errors
    pub name: String,
    /// Location of the table
    pub path: PathBuf,
    /// Header of the timestamp column (default: `date`)
    #[serde(default = "default_date_column")]
    pub date_column: String,
    /// Numeric columns to load
    pub columns: Vec<ColumnSpec>,
}

/// A loaded source table: one series per requested column.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    name: String,
    series: Vec<Series>,
}

impl SourceTable {
    /// Create a table from already-built series.
    pub fn new(name: impl Into<String>, series: Vec<Series>) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Series in column order.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Look up a series by name.
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name() == name)
    }

    /// Consume the table, returning its series.
    pub fn into_series(self) -> Vec<Series> {
        self.series
    }

    /// Panel of the table's columns on the union of their dates.
    ///
    /// # Errors
    /// Returns an error if two columns share a name.
    pub fn to_panel(&self) -> Result<Panel> {
        Panel::from_series(&self.series)
    }
}

/// Produces clean source tables for the pipeline.
pub trait TableLoader {
    /// Load the columns described by `spec`.
    ///
    /// # Errors
    /// Returns an error if the table is missing, unreadable or malformed.
    fn load(&self, spec: &TableSpec) -> Result<SourceTable>;
}

/// Loads source tables from CSV files with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableLoader;

impl CsvTableLoader {
    /// Create a new CSV loader.
    pub const fn new() -> Self {
        Self
    }
}

impl TableLoader for CsvTableLoader {
    fn load(&self, spec: &TableSpec) -> Result<SourceTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&spec.path)
            .map_err(|e| DataError::MissingData {
                source_name: spec.name.clone(),
                reason: format!("{}: {}", spec.path.display(), e),
            })?;

        let headers = reader.headers()?.clone();
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| DataError::MissingColumn {
                    source_name: spec.name.clone(),
                    column: column.to_string(),
                })
        };

        let date_idx = position(&spec.date_column)?;
        let value_idx = spec
            .columns
            .iter()
            .map(|c| position(&c.name))
            .collect::<Result<Vec<_>>>()?;

        let mut dates = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); spec.columns.len()];

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let raw_date = record.get(date_idx).unwrap_or_default();
            dates.push(parse_date(raw_date).ok_or_else(|| {
                DataError::Parse(format!(
                    "{} row {}: invalid date {:?}",
                    spec.name,
                    line + 1,
                    raw_date
                ))
            })?);

            for (column, &idx) in value_idx.iter().enumerate() {
                let cell = record.get(idx).unwrap_or_default();
                values[column].push(parse_value(cell).map_err(|_| {
                    DataError::Parse(format!(
                        "{} row {}: invalid value {:?} in {}",
                        spec.name,
                        line + 1,
                        cell,
                        spec.columns[column].name
                    ))
                })?);
            }
        }

        if dates.is_empty() {
            return Err(DataError::MissingData {
                source_name: spec.name.clone(),
                reason: "table has no rows".to_string(),
            });
        }

        let series = spec
            .columns
            .iter()
            .zip(&values)
            .map(|(column, values)| {
                Series::from_columns(
                    column.output_name(),
                    column.frequency,
                    column.class,
                    &dates,
                    values,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            source = %spec.name,
            rows = dates.len(),
            columns = series.len(),
            "loaded source table"
        );

        Ok(SourceTable::new(&spec.name, series))
    }
}

/// Parse an ISO date, an ISO datetime (date part kept) or a bare year.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).filter(|_| {
        raw.len() == 10 || matches!(raw.as_bytes().get(10), Some(b' ' | b'T'))
    });

    if let Some(date) = date_part.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
        return Some(date);
    }

    // Annual tables key rows on the year alone, sometimes written as a float
    let year = raw.strip_suffix(".0").unwrap_or(raw);
    year.parse::<i32>()
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
}

/// Parse a numeric cell; missing markers yield `Ok(None)`.
fn parse_value(raw: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if MISSING_MARKERS
        .iter()
        .any(|m| trimmed.eq_ignore_ascii_case(m))
    {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("2024-03-05", Some(date(2024, 3, 5)))]
    #[case("2024-03-05 00:00:00", Some(date(2024, 3, 5)))]
    #[case("2024-03-05T12:30:00", Some(date(2024, 3, 5)))]
    #[case("1999", Some(date(1999, 1, 1)))]
    #[case("1999.0", Some(date(1999, 1, 1)))]
    #[case("05/03/2024", None)]
    #[case("", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(raw), expected);
    }

    #[rstest]
    #[case("1.5", Some(1.5))]
    #[case("", None)]
    #[case(".", None)]
    #[case("NaN", None)]
    #[case("inf", None)]
    fn test_parse_value(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_value(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_value_rejects_text() {
        assert!(parse_value("abc").is_err());
    }

    fn write_table(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_csv_loader() {
        let file = write_table(
            "date,close,volume,yield\n\
             2024-01-02,100.0,5,4.1\n\
             2024-01-03,,6,4.2\n\
             2024-01-04,102.5,7,.\n",
        );
        let spec = TableSpec {
            name: "market".to_string(),
            path: file.path().to_path_buf(),
            date_column: "date".to_string(),
            columns: vec![
                ColumnSpec::new("close", Frequency::Daily).with_rename("sp500_close"),
                ColumnSpec::new("yield", Frequency::Daily),
            ],
        };

        let table = CsvTableLoader::new().load(&spec).unwrap();
        assert_eq!(table.name(), "market");
        assert_eq!(table.series().len(), 2);

        let close = table.get("sp500_close").unwrap();
        assert_eq!(
            close.points(),
            &[(date(2024, 1, 2), 100.0), (date(2024, 1, 4), 102.5)]
        );
        assert_eq!(table.get("yield").unwrap().len(), 2);

        let panel = table.to_panel().unwrap();
        assert_eq!(panel.len(), 3);
    }

    #[test]
    fn test_csv_loader_missing_file() {
        let spec = TableSpec {
            name: "gone".to_string(),
            path: PathBuf::from("/definitely/not/here.csv"),
            date_column: "date".to_string(),
            columns: vec![ColumnSpec::new("close", Frequency::Daily)],
        };
        let err = CsvTableLoader::new().load(&spec).unwrap_err();
        assert!(matches!(err, DataError::MissingData { ref source_name, .. } if source_name == "gone"));
    }

    #[test]
    fn test_csv_loader_missing_column() {
        let file = write_table("date,close\n2024-01-02,1.0\n");
        let spec = TableSpec {
            name: "t".to_string(),
            path: file.path().to_path_buf(),
            date_column: "date".to_string(),
            columns: vec![ColumnSpec::new("open", Frequency::Daily)],
        };
        let err = CsvTableLoader::new().load(&spec).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "open"));
    }

    #[test]
    fn test_csv_loader_unsorted_dates() {
        let file = write_table("Year,price\n2001,1.0\n2000,2.0\n");
        let spec = TableSpec {
            name: "t".to_string(),
            path: file.path().to_path_buf(),
            date_column: "Year".to_string(),
            columns: vec![ColumnSpec::new("price", Frequency::Annual)],
        };
        assert!(matches!(
            CsvTableLoader::new().load(&spec),
            Err(DataError::UnsortedIndex { .. })
        ));
    }
}
