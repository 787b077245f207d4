//! Named, typed value streams.
//!
//! A [`Series`] is the unit every pipeline stage exchanges before merging:
//! one column of one source table with its native frequency and transform
//! class attached at creation time.

use crate::error::{DataError, Result};
use crate::frequency::Frequency;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale a column is expressed on.
///
/// Correlations are only ever computed between columns of the same class.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransformClass {
    /// Untransformed level
    #[default]
    Raw,
    /// Natural logarithm of the level
    #[serde(alias = "log")]
    LogLevel,
    /// Natural logarithm of the ratio of consecutive levels
    #[serde(alias = "log_returns")]
    LogReturn,
}

impl TransformClass {
    /// All classes in output order.
    pub const ALL: [Self; 3] = [Self::Raw, Self::LogLevel, Self::LogReturn];

    /// Short label used in artifact names (`raw`, `log`, `log_returns`).
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::LogLevel => "log",
            Self::LogReturn => "log_returns",
        }
    }
}

impl fmt::Display for TransformClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered stream of `(date, value)` observations.
///
/// Dates are strictly increasing and every stored value is finite; a missing
/// observation is an absent point.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    frequency: Frequency,
    class: TransformClass,
    points: Vec<(NaiveDate, f64)>,
}

impl Series {
    /// Create a series, dropping non-finite values.
    ///
    /// # Errors
    /// Returns [`DataError::UnsortedIndex`] if dates are not strictly increasing.
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        class: TransformClass,
        points: Vec<(NaiveDate, f64)>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(pair) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(DataError::UnsortedIndex {
                series: name,
                date: pair[1].0.to_string(),
            });
        }

        let points = points.into_iter().filter(|(_, v)| v.is_finite()).collect();

        Ok(Self {
            name,
            frequency,
            class,
            points,
        })
    }

    /// Create a series from a date column and an aligned optional value column.
    ///
    /// # Errors
    /// Returns an error if the lengths differ or dates are not strictly increasing.
    pub fn from_columns(
        name: impl Into<String>,
        frequency: Frequency,
        class: TransformClass,
        dates: &[NaiveDate],
        values: &[Option<f64>],
    ) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(DataError::LengthMismatch {
                column: name,
                expected: dates.len(),
                actual: values.len(),
            });
        }

        // Dates of missing cells still have to respect the ordering
        if let Some(pair) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(DataError::UnsortedIndex {
                series: name,
                date: pair[1].to_string(),
            });
        }

        let points = dates
            .iter()
            .zip(values)
            .filter_map(|(d, v)| v.map(|v| (*d, v)))
            .collect();

        Self::new(name, frequency, class, points)
    }

    /// Build from points already known to be sorted and finite.
    pub(crate) const fn from_sorted(
        name: String,
        frequency: Frequency,
        class: TransformClass,
        points: Vec<(NaiveDate, f64)>,
    ) -> Self {
        Self {
            name,
            frequency,
            class,
            points,
        }
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native frequency.
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Transform class.
    pub const fn class(&self) -> TransformClass {
        self.class
    }

    /// Observations in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First observation date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    /// Last observation date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    /// Same observations under a different name.
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Natural log of every strictly positive observation, named `log_{name}`.
    ///
    /// Non-positive observations are omitted.
    pub fn log_level(&self) -> Self {
        let points = self
            .points
            .iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(d, v)| (*d, v.ln()))
            .collect();

        Self::from_sorted(
            format!("log_{}", self.name),
            self.frequency,
            TransformClass::LogLevel,
            points,
        )
    }

    /// `ln(x_t / x_{t-1})` over consecutive observations, named `log_return_{name}`.
    ///
    /// The first observation has no predecessor and is omitted, as is every
    /// observation whose ratio to its predecessor is not strictly positive.
    pub fn log_return(&self) -> Self {
        let points = self
            .points
            .windows(2)
            .filter_map(|w| {
                let ratio = w[1].1 / w[0].1;
                (ratio > 0.0 && ratio.is_finite()).then(|| (w[1].0, ratio.ln()))
            })
            .collect();

        Self::from_sorted(
            format!("log_return_{}", self.name),
            self.frequency,
            TransformClass::LogReturn,
            points,
        )
    }
}
