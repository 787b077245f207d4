//! Outer-join merging of normalized panels.
//!
//! Sources rarely cover the same window. After the join, gaps are closed by
//! forward-filling and then backward-filling each column along time. The
//! backward pass lets the earliest rows of a shorter series borrow its first
//! known value; [`GapFill`] can switch that off, the default keeps it.

use crate::error::{DataError, Result};
use crate::frame::DATE_COLUMN;
use crate::panel::Panel;
use crate::series::TransformClass;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Gap-closing strategy applied after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    /// Forward fill, then backward fill
    #[default]
    ForwardThenBackward,
    /// Forward fill only; leading gaps stay missing
    ForwardOnly,
    /// Leave gaps as they are
    None,
}

impl GapFill {
    fn apply(self, frame: DataFrame) -> PolarsResult<DataFrame> {
        match self {
            Self::ForwardThenBackward => frame
                .fill_null(FillNullStrategy::Forward(None))?
                .fill_null(FillNullStrategy::Backward(None)),
            Self::ForwardOnly => frame.fill_null(FillNullStrategy::Forward(None)),
            Self::None => Ok(frame),
        }
    }
}

/// Full outer join of `panels` on their date indices, without filling.
///
/// Column order follows input order.
///
/// # Errors
/// Returns [`DataError::DuplicateColumn`] if two panels share a column name.
pub fn outer_join(panels: &[Panel]) -> Result<Panel> {
    let classes = column_classes(panels)?;
    if panels.is_empty() {
        return Ok(Panel::default());
    }

    let frame = join_frames(panels)?;
    Panel::from_dataframe(&frame, |name| classes.get(name).copied().unwrap_or_default())
}

/// Join `panels`, close gaps per `gap_fill`, and drop columns left empty.
///
/// # Errors
/// Returns [`DataError::DuplicateColumn`] if two panels share a column name.
pub fn merge(panels: &[Panel], gap_fill: GapFill) -> Result<Panel> {
    let classes = column_classes(panels)?;
    if panels.is_empty() {
        return Ok(Panel::default());
    }

    let frame = gap_fill.apply(join_frames(panels)?)?;

    let height = frame.height();
    let (dropped, kept): (Vec<&Column>, Vec<&Column>) = frame
        .get_columns()
        .iter()
        .partition(|column| column.name().as_str() != DATE_COLUMN && column.null_count() == height);
    if !dropped.is_empty() {
        let names: Vec<&str> = dropped.iter().map(|column| column.name().as_str()).collect();
        debug!(columns = ?names, "dropped empty columns after merge");
    }
    let kept: Vec<PlSmallStr> = kept.iter().map(|column| column.name().clone()).collect();
    let frame = frame.select(kept)?;

    let merged = Panel::from_dataframe(&frame, |name| {
        classes.get(name).copied().unwrap_or_default()
    })?;

    debug!(
        rows = merged.len(),
        columns = merged.width(),
        sources = panels.len(),
        "merged panels"
    );

    Ok(merged)
}

/// Class of every column across `panels`, rejecting repeated names.
fn column_classes(panels: &[Panel]) -> Result<HashMap<&str, TransformClass>> {
    let mut classes = HashMap::new();
    for column in panels.iter().flat_map(Panel::columns) {
        if classes.insert(column.name(), column.class()).is_some() {
            return Err(DataError::DuplicateColumn(column.name().to_string()));
        }
    }
    Ok(classes)
}

/// Full join of the panels' frames on `date`, sorted by date.
fn join_frames(panels: &[Panel]) -> Result<DataFrame> {
    let mut frames = panels.iter().map(|panel| panel.to_dataframe().map(IntoLazy::lazy));
    let Some(first) = frames.next() else {
        return Ok(DataFrame::empty());
    };

    let mut joined = first?;
    for frame in frames {
        joined = joined.join(
            frame?,
            [col(DATE_COLUMN)],
            [col(DATE_COLUMN)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        );
    }

    Ok(joined
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelColumn;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn panel(dates: &[NaiveDate], columns: &[(&str, Vec<Option<f64>>)]) -> Panel {
        let columns = columns
            .iter()
            .map(|(name, values)| PanelColumn::new(*name, TransformClass::Raw, values.clone()))
            .collect();
        Panel::new(dates.to_vec(), columns).unwrap()
    }

    #[test]
    fn test_merge_shared_date_fills_everything() {
        let left = panel(
            &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)],
            &[("a", vec![Some(1.0), Some(2.0), Some(3.0)])],
        );
        let right = panel(
            &[date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)],
            &[
                ("b", vec![Some(10.0), Some(20.0), Some(30.0)]),
                ("never", vec![None, None, None]),
            ],
        );

        let merged = merge(&[left, right], GapFill::default()).unwrap();

        assert_eq!(merged.len(), 5);
        assert_eq!(merged.column_names(), vec!["a", "b"]);
        assert!(!merged.has_missing());
        assert_eq!(
            merged.column("a").unwrap().values(),
            &[Some(1.0), Some(2.0), Some(3.0), Some(3.0), Some(3.0)]
        );
        assert_eq!(
            merged.column("b").unwrap().values(),
            &[Some(10.0), Some(10.0), Some(10.0), Some(20.0), Some(30.0)]
        );
    }

    #[test]
    fn test_merge_keeps_classes_and_fills_interior_gaps() {
        let left = Panel::new(
            vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)],
            vec![PanelColumn::new(
                "a",
                TransformClass::LogReturn,
                vec![None, Some(1.0), None, Some(3.0)],
            )],
        )
        .unwrap();
        let right = panel(&[date(2024, 1, 2)], &[("b", vec![Some(7.0)])]);

        let merged = merge(&[left, right], GapFill::default()).unwrap();

        let a = merged.column("a").unwrap();
        assert_eq!(a.class(), TransformClass::LogReturn);
        assert_eq!(a.values(), &[Some(1.0), Some(1.0), Some(1.0), Some(3.0)]);
        assert_eq!(merged.column("b").unwrap().values(), &[Some(7.0); 4]);
        assert_eq!(merged.column("b").unwrap().class(), TransformClass::Raw);
    }

    #[test]
    fn test_outer_join_leaves_gaps_and_empty_columns() {
        let left = panel(&[date(2024, 1, 1), date(2024, 1, 3)], &[("a", vec![Some(1.0), Some(3.0)])]);
        let right = panel(&[date(2024, 1, 2)], &[("b", vec![None])]);

        let joined = outer_join(&[left, right]).unwrap();
        assert_eq!(joined.index(), &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(joined.column("a").unwrap().values(), &[Some(1.0), None, Some(3.0)]);
        assert_eq!(joined.column("b").unwrap().values(), &[None, None, None]);
    }

    #[test]
    fn test_forward_only_keeps_leading_gaps() {
        let left = panel(&[date(2024, 1, 1)], &[("a", vec![Some(1.0)])]);
        let right = panel(&[date(2024, 1, 2)], &[("b", vec![Some(2.0)])]);

        let merged = merge(&[left, right], GapFill::ForwardOnly).unwrap();
        assert_eq!(merged.column("a").unwrap().values(), &[Some(1.0), Some(1.0)]);
        assert_eq!(merged.column("b").unwrap().values(), &[None, Some(2.0)]);
    }

    #[test]
    fn test_no_fill() {
        let left = panel(&[date(2024, 1, 1)], &[("a", vec![Some(1.0)])]);
        let right = panel(&[date(2024, 1, 2)], &[("b", vec![Some(2.0)])]);

        let merged = merge(&[left, right], GapFill::None).unwrap();
        assert!(merged.has_missing());
        assert_eq!(merged.width(), 2);
    }

    #[test]
    fn test_duplicate_column_across_panels() {
        let left = panel(&[date(2024, 1, 1)], &[("a", vec![Some(1.0)])]);
        let right = panel(&[date(2024, 1, 2)], &[("a", vec![Some(2.0)])]);
        assert!(matches!(
            merge(&[left, right], GapFill::default()),
            Err(DataError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let merged = merge(&[], GapFill::default()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.width(), 0);
    }
}
