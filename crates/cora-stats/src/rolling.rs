//! Trailing-window correlation between pairs of panel columns.
//!
//! For every unordered pair of selected columns and every configured window,
//! a Pearson correlation is computed at each row whose trailing window holds
//! `size` complete rows. The resulting daily series are then thinned to one
//! sample per week or month, keeping the last defined value in each bucket.

use crate::correlation::{pearson, pearson_complete};
use crate::error::{Result, StatsError};
use chrono::{Datelike, Days, Months, NaiveDate};
use cora_data::Panel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named trailing window measured in panel rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Label used in outputs, e.g. `30D`
    pub label: String,
    /// Number of rows in the window
    pub size: usize,
}

impl RollingWindow {
    /// Create a window.
    pub fn new(label: impl Into<String>, size: usize) -> Self {
        Self {
            label: label.into(),
            size,
        }
    }
}

/// Output cadence of rolling samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Downsample {
    /// Weeks ending Sunday, labelled by that Sunday
    #[default]
    Weekly,
    /// Calendar months, labelled by the last day of the month
    Monthly,
    /// Keep every defined sample
    None,
}

impl Downsample {
    /// Label of the bucket containing `date`.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday)).unwrap_or(date)
            }
            Self::Monthly => month_end(date).unwrap_or(date),
            Self::None => date,
        }
    }
}

fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn default_windows() -> Vec<RollingWindow> {
    vec![
        RollingWindow::new("30D", 30),
        RollingWindow::new("60D", 60),
        RollingWindow::new("90D", 90),
        RollingWindow::new("180D", 180),
    ]
}

const fn default_current_window() -> usize {
    60
}

/// Rolling correlation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Trailing windows (default: 30, 60, 90 and 180 rows)
    #[serde(default = "default_windows")]
    pub windows: Vec<RollingWindow>,

    /// Output cadence (default: weekly)
    #[serde(default)]
    pub downsample: Downsample,

    /// Rows used for each pair's current correlation (default: 60)
    #[serde(default = "default_current_window")]
    pub current_window: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            downsample: Downsample::default(),
            current_window: default_current_window(),
        }
    }
}

impl RollingConfig {
    /// Check that every window spans at least two rows.
    ///
    /// # Errors
    /// Returns [`StatsError::InvalidParameter`] for a window or current window
    /// smaller than two rows.
    pub fn validate(&self) -> Result<()> {
        if let Some(window) = self.windows.iter().find(|w| w.size < 2) {
            return Err(StatsError::InvalidParameter(format!(
                "rolling window {} has size {} (must be at least 2)",
                window.label, window.size
            )));
        }
        if self.current_window < 2 {
            return Err(StatsError::InvalidParameter(format!(
                "current window {} must be at least 2",
                self.current_window
            )));
        }
        Ok(())
    }
}

/// A dated rolling correlation value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingSample {
    /// Bucket label date
    pub date: NaiveDate,
    /// Correlation over the window ending in this bucket
    pub corr: f64,
}

/// Downsampled rolling correlation for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSeries {
    /// Window label
    pub label: String,
    /// Window size in rows
    pub size: usize,
    /// Samples in date order
    pub samples: Vec<RollingSample>,
}

/// Rolling correlations of one column pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingPair {
    /// First column
    pub a: String,
    /// Second column
    pub b: String,
    /// One series per configured window, in configuration order
    pub windows: Vec<WindowSeries>,
    /// Correlation over the most recent rows, if defined
    pub current: Option<f64>,
}

impl RollingPair {
    /// Display label, `a / b`.
    pub fn label(&self) -> String {
        format!("{} / {}", self.a, self.b)
    }

    /// Series for the window labelled `label`.
    pub fn window(&self, label: &str) -> Option<&WindowSeries> {
        self.windows.iter().find(|w| w.label == label)
    }
}

/// Trailing-window correlation of `x` and `y` at every row.
///
/// Row `t` is defined only when rows `t + 1 - size ..= t` all hold both values
/// and neither side is constant over the window.
pub fn rolling_pearson(x: &[Option<f64>], y: &[Option<f64>], size: usize) -> Vec<Option<f64>> {
    let rows = x.len().min(y.len());
    let mut out = vec![None; rows];
    if size < 2 || rows < size {
        return out;
    }

    let complete: Vec<Option<(f64, f64)>> = x
        .iter()
        .zip(y)
        .map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    // Length of the run of complete rows ending at each row
    let mut run = 0;
    let mut window = Vec::with_capacity(size);
    for t in 0..rows {
        run = if complete[t].is_some() { run + 1 } else { 0 };
        if run < size {
            continue;
        }
        window.clear();
        window.extend(complete[t + 1 - size..=t].iter().flatten().copied());
        out[t] = pearson_complete(&window);
    }

    out
}

/// Thin a per-row series to one value per bucket, keeping the last defined one.
pub fn downsample(
    index: &[NaiveDate],
    values: &[Option<f64>],
    cadence: Downsample,
) -> Vec<RollingSample> {
    let mut samples: Vec<RollingSample> = Vec::new();
    for (date, value) in index.iter().zip(values) {
        let Some(corr) = value.filter(|v| v.is_finite()) else {
            continue;
        };
        let bucket = cadence.bucket(*date);
        match samples.last_mut() {
            Some(last) if last.date == bucket => last.corr = corr,
            _ => samples.push(RollingSample { date: bucket, corr }),
        }
    }
    samples
}

/// Rolling correlations for every unordered pair of `columns`.
///
/// Pairs follow input order (`i < j`).
///
/// # Errors
/// Returns [`StatsError::UnknownColumn`] if a column is not in the panel, or
/// [`StatsError::InvalidParameter`] if the configuration is invalid.
pub fn rolling_correlations(
    panel: &Panel,
    columns: &[&str],
    config: &RollingConfig,
) -> Result<Vec<RollingPair>> {
    config.validate()?;

    let selected = columns
        .iter()
        .map(|name| {
            panel
                .column(name)
                .ok_or_else(|| StatsError::UnknownColumn((*name).to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let pairs: Vec<(usize, usize)> = (0..selected.len())
        .flat_map(|i| ((i + 1)..selected.len()).map(move |j| (i, j)))
        .collect();

    debug!(
        columns = selected.len(),
        pairs = pairs.len(),
        windows = config.windows.len(),
        "computing rolling correlations"
    );

    let tail_start = panel.len().saturating_sub(config.current_window);

    let results = pairs
        .par_iter()
        .map(|&(i, j)| {
            let x = selected[i].values();
            let y = selected[j].values();

            let windows = config
                .windows
                .iter()
                .map(|window| WindowSeries {
                    label: window.label.clone(),
                    size: window.size,
                    samples: downsample(
                        panel.index(),
                        &rolling_pearson(x, y, window.size),
                        config.downsample,
                    ),
                })
                .collect();

            RollingPair {
                a: selected[i].name().to_string(),
                b: selected[j].name().to_string(),
                windows,
                current: pearson(&x[tail_start..], &y[tail_start..]),
            }
        })
        .collect();

    Ok(results)
}
