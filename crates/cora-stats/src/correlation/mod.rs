//! Pearson correlation across panel columns.
//!
//! Each transform class gets its own matrix; raw levels, log levels and log
//! returns are never correlated against one another. Pairs are evaluated over
//! pairwise-complete observations, so a gap in one column only removes the
//! affected rows from the pairs that involve it.

pub mod matrix;

pub use matrix::CorrelationMatrix;

use crate::error::{Result, StatsError};
use cora_data::{Panel, TransformClass};
use ndarray::Array2;
use std::collections::BTreeMap;
use tracing::debug;

/// Pearson correlation of `x` and `y` over rows where both are present.
///
/// Returns `None` with fewer than two complete rows or when either side has
/// zero variance. The result is clamped to [-1, 1].
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    pearson_complete(&pairs)
}

/// Pearson correlation of complete `(x, y)` pairs.
pub(crate) fn pearson_complete(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Correlation matrix over equally long columns.
///
/// Used directly for within-source matrices, where every numeric column of a
/// table is correlated regardless of transform class.
///
/// # Errors
/// Returns [`StatsError::DimensionMismatch`] if the names and columns differ in
/// count or the columns differ in length.
pub fn correlate_columns<S: AsRef<str>>(
    names: &[S],
    columns: &[&[Option<f64>]],
) -> Result<CorrelationMatrix> {
    if names.len() != columns.len() {
        return Err(StatsError::DimensionMismatch {
            expected: names.len(),
            actual: columns.len(),
        });
    }
    if let Some(first) = columns.first()
        && let Some(bad) = columns.iter().find(|c| c.len() != first.len())
    {
        return Err(StatsError::DimensionMismatch {
            expected: first.len(),
            actual: bad.len(),
        });
    }

    let n = columns.len();
    let mut values = Array2::<f64>::from_elem((n, n), f64::NAN);
    for i in 0..n {
        // A column correlates perfectly with itself unless it is constant
        if pearson(columns[i], columns[i]).is_some() {
            values[[i, i]] = 1.0;
        }
        for j in (i + 1)..n {
            let r = pearson(columns[i], columns[j]).unwrap_or(f64::NAN);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    let names = names.iter().map(|s| s.as_ref().to_string()).collect();
    CorrelationMatrix::new(names, values)
}

/// Correlation matrix of the panel's columns tagged with `class`.
///
/// Returns `None` when fewer than two columns carry that class.
pub fn correlate(panel: &Panel, class: TransformClass) -> Option<CorrelationMatrix> {
    let columns: Vec<_> = panel.columns_of_class(class).collect();
    if columns.len() < 2 {
        debug!(
            class = %class,
            columns = columns.len(),
            "skipping correlation, need at least two columns"
        );
        return None;
    }

    let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
    let values: Vec<&[Option<f64>]> = columns.iter().map(|c| c.values()).collect();

    // Panel columns are aligned to one index, so the shapes always agree
    correlate_columns(&names, &values).ok()
}

/// One matrix per transform class present with at least two columns.
pub fn correlate_by_class(panel: &Panel) -> BTreeMap<TransformClass, CorrelationMatrix> {
    TransformClass::ALL
        .iter()
        .filter_map(|&class| correlate(panel, class).map(|m| (class, m)))
        .collect()
}
