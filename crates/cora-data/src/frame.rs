//! Conversions between panels and polars `DataFrame`s.
//!
//! Frames carry the index in a `date` column of polars `Date` type followed by
//! one `Float64` column per panel column. Transform classes do not survive the
//! round trip; callers supply them when reading a frame back.

use crate::error::{DataError, Result};
use crate::panel::{Panel, PanelColumn};
use crate::series::TransformClass;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use polars::prelude::*;

/// Name of the index column in frames produced by [`Panel::to_dataframe`].
pub const DATE_COLUMN: &str = "date";

/// Build a polars `Date` column from calendar dates.
pub(crate) fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column> {
    let days: Vec<i32> = dates
        .iter()
        .map(|date| (*date - NaiveDateTime::UNIX_EPOCH.date()).num_days() as i32)
        .collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

/// Read a `Date` column back into calendar dates.
///
/// Null dates are rejected.
pub(crate) fn read_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let days = df
        .column(name)
        .map_err(|_| DataError::MissingColumn {
            source_name: "dataframe".to_string(),
            column: name.to_string(),
        })?
        .cast(&DataType::Int32)?;

    days.i32()?
        .into_iter()
        .map(|day| {
            day.and_then(|d| NaiveDateTime::UNIX_EPOCH.date().checked_add_signed(TimeDelta::days(d.into())))
                .ok_or_else(|| DataError::Parse(format!("{}: missing or out-of-range date", name)))
        })
        .collect()
}

impl Panel {
    /// Convert to a `DataFrame` with a `date` column and one column per panel column.
    ///
    /// # Errors
    /// Returns an error if polars rejects the frame.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.width() + 1);
        columns.push(date_column(DATE_COLUMN, self.index())?);
        for column in self.columns() {
            columns.push(Column::new(column.name().into(), column.values().to_vec()));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Read a frame produced by [`Panel::to_dataframe`] back into a panel.
    ///
    /// `class_of` tags each non-date column by name. Every row is kept, even
    /// rows where all values are missing.
    ///
    /// # Errors
    /// Returns an error if the frame has no `date` column, a date is null, or
    /// a column is not numeric.
    pub fn from_dataframe<F>(df: &DataFrame, class_of: F) -> Result<Self>
    where
        F: Fn(&str) -> TransformClass,
    {
        let index = read_dates(df, DATE_COLUMN)?;

        let columns = df
            .get_columns()
            .iter()
            .filter(|column| column.name().as_str() != DATE_COLUMN)
            .map(|column| {
                let name = column.name().as_str();
                let values = column.cast(&DataType::Float64)?;
                let values: Vec<Option<f64>> = values.f64()?.into_iter().collect();
                Ok(PanelColumn::new(name, class_of(name), values))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(index, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_panel() -> Panel {
        Panel::new(
            vec![date(1969, 12, 1), date(2024, 2, 1), date(2024, 3, 1)],
            vec![
                PanelColumn::new("gold", TransformClass::Raw, vec![Some(1.0), Some(2.0), None]),
                PanelColumn::new("oil", TransformClass::LogLevel, vec![None, None, None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_to_dataframe() {
        let df = sample_panel().to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);

        let gold = df.column("gold").unwrap().f64().unwrap();
        assert_eq!(gold.get(1), Some(2.0));
        assert_eq!(gold.get(2), None);
    }

    #[test]
    fn test_round_trip_keeps_empty_rows_and_columns() {
        let panel = sample_panel();
        let df = panel.to_dataframe().unwrap();
        let back = Panel::from_dataframe(&df, |name| match name {
            "oil" => TransformClass::LogLevel,
            _ => TransformClass::Raw,
        })
        .unwrap();

        assert_eq!(back.index(), panel.index());
        assert_eq!(back.column("gold").unwrap().values(), &[Some(1.0), Some(2.0), None]);
        assert_eq!(back.column("oil").unwrap().values(), &[None, None, None]);
        assert_eq!(back.column("oil").unwrap().class(), TransformClass::LogLevel);
    }

    #[test]
    fn test_from_dataframe_without_date_column() {
        let df = DataFrame::new(vec![Column::new("gold".into(), vec![1.0_f64])]).unwrap();
        assert!(matches!(
            Panel::from_dataframe(&df, |_| TransformClass::Raw),
            Err(DataError::MissingColumn { .. })
        ));
    }
}
