//! Date-aligned tables of columns.

use crate::error::{DataError, Result};
use crate::series::{Series, TransformClass};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// One column of a [`Panel`], aligned to the panel's index.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelColumn {
    name: String,
    class: TransformClass,
    values: Vec<Option<f64>>,
}

impl PanelColumn {
    /// Create a column. Non-finite values are stored as missing.
    pub fn new(name: impl Into<String>, class: TransformClass, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Self {
            name: name.into(),
            class,
            values,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transform class.
    pub const fn class(&self) -> TransformClass {
        self.class
    }

    /// Values aligned to the panel index.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }
}

/// A sorted, duplicate-free date index with aligned columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    index: Vec<NaiveDate>,
    columns: Vec<PanelColumn>,
}

impl Panel {
    /// Create a panel, sorting the index.
    ///
    /// Rows sharing a date collapse to the row that appeared last.
    ///
    /// # Errors
    /// Returns an error on duplicate column names or misaligned columns.
    pub fn new(index: Vec<NaiveDate>, columns: Vec<PanelColumn>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != index.len() {
                return Err(DataError::LengthMismatch {
                    column: column.name.clone(),
                    expected: index.len(),
                    actual: column.values.len(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(DataError::DuplicateColumn(column.name.clone()));
            }
        }

        // Stable sort keeps original order among equal dates, so the last of
        // each run is the latest occurrence
        let mut order: Vec<usize> = (0..index.len()).collect();
        order.sort_by_key(|&i| index[i]);
        let keep: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|&(pos, &row)| {
                order
                    .get(pos + 1)
                    .is_none_or(|&next| index[next] != index[row])
            })
            .map(|(_, &row)| row)
            .collect();

        let sorted_index = keep.iter().map(|&row| index[row]).collect();
        let columns = columns
            .into_iter()
            .map(|column| PanelColumn {
                values: keep.iter().map(|&row| column.values[row]).collect(),
                ..column
            })
            .collect();

        Ok(Self {
            index: sorted_index,
            columns,
        })
    }

    /// Outer-join series on their dates, one column per series.
    ///
    /// # Errors
    /// Returns [`DataError::DuplicateColumn`] if two series share a name.
    pub fn from_series(series: &[Series]) -> Result<Self> {
        let index: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points().iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = series
            .iter()
            .map(|s| {
                let mut values = vec![None; index.len()];
                for (date, value) in s.points() {
                    if let Ok(row) = index.binary_search(date) {
                        values[row] = Some(*value);
                    }
                }
                PanelColumn::new(s.name(), s.class(), values)
            })
            .collect();

        Self::new(index, columns)
    }

    /// Sorted date index.
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&PanelColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns tagged with `class`, in order.
    pub fn columns_of_class(&self, class: TransformClass) -> impl Iterator<Item = &PanelColumn> {
        self.columns.iter().filter(move |c| c.class == class)
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the panel has no rows.
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub const fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether any column has a gap.
    pub fn has_missing(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.values.iter().any(Option::is_none))
    }
}
