//! Frequency normalization.
//!
//! Moves a single series onto a canonical daily, month-start or year grid.
//! Expansion carries known observations forward and never looks ahead;
//! reduction groups observations by period start in a polars frame and keeps
//! either the final observation or the mean of each group.

use crate::error::{DataError, Result};
use crate::frequency::{Frequency, ResamplePolicy};
use crate::frame::{DATE_COLUMN, date_column, read_dates};
use crate::series::Series;
use chrono::NaiveDate;
use polars::prelude::*;

const VALUE_COLUMN: &str = "value";

/// Rewrite `series` onto the `target` grid using `policy`.
///
/// The output keeps the input's name and transform class and carries the
/// target frequency. Output dates are period starts of the target grid.
///
/// # Errors
/// Returns [`DataError::InvalidPolicy`] when expansion is asked to coarsen or
/// a reduction is asked to refine.
pub fn normalize(series: &Series, target: Frequency, policy: ResamplePolicy) -> Result<Series> {
    if !policy.supports(series.frequency(), target) {
        return Err(DataError::InvalidPolicy {
            series: series.name().to_string(),
            policy: policy.name().to_string(),
            from: series.frequency().name().to_string(),
            to: target.name().to_string(),
        });
    }

    let points = match policy {
        ResamplePolicy::ExpandForwardFill => expand(series.points(), target),
        ResamplePolicy::LastOfPeriod => reduce(series.points(), target, col(VALUE_COLUMN).last())?,
        ResamplePolicy::MeanOfPeriod => reduce(series.points(), target, col(VALUE_COLUMN).mean())?,
    };

    Ok(Series::from_sorted(
        series.name().to_string(),
        target,
        series.class(),
        points,
    ))
}

/// Assign to every grid date the latest observation dated on or before it.
fn expand(points: &[(NaiveDate, f64)], target: Frequency) -> Vec<(NaiveDate, f64)> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };

    let end = target.period_start(last.0);
    let mut grid_date = Some(target.period_start(first.0));
    let mut cursor = 0;
    let mut out = Vec::new();

    while let Some(date) = grid_date.filter(|d| *d <= end) {
        while cursor + 1 < points.len() && points[cursor + 1].0 <= date {
            cursor += 1;
        }
        // Grid dates before the first observation stay empty
        if points[cursor].0 <= date {
            out.push((date, points[cursor].1));
        }
        grid_date = target.next_period(date);
    }

    out
}

/// Group observations by target period start and aggregate each group.
fn reduce(
    points: &[(NaiveDate, f64)],
    target: Frequency,
    aggregate: Expr,
) -> Result<Vec<(NaiveDate, f64)>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let periods: Vec<NaiveDate> = points.iter().map(|(d, _)| target.period_start(*d)).collect();
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let frame = DataFrame::new(vec![
        date_column(DATE_COLUMN, &periods)?,
        Column::new(VALUE_COLUMN.into(), values),
    ])?;

    let reduced = frame
        .lazy()
        .group_by_stable([col(DATE_COLUMN)])
        .agg([aggregate])
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let dates = read_dates(&reduced, DATE_COLUMN)?;
    let values = reduced.column(VALUE_COLUMN)?.f64()?;

    Ok(dates
        .into_iter()
        .zip(values)
        .filter_map(|(date, value)| value.filter(|v| v.is_finite()).map(|v| (date, v)))
        .collect())
}
