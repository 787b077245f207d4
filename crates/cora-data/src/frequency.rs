//! Sampling frequencies and resampling policies.
//!
//! Every series lives on one of three canonical grids. A grid date is the
//! first calendar day of its period, so series from different sources land on
//! exactly the same keys once normalized.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical sampling frequency, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One point per calendar day
    Daily,
    /// One point per month, keyed on the first day of the month
    Monthly,
    /// One point per year, keyed on January 1st
    Annual,
}

impl Frequency {
    /// All frequencies, finest first.
    pub const ALL: [Self; 3] = [Self::Daily, Self::Monthly, Self::Annual];

    /// Lowercase name used in file names and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// First calendar day of the period containing `date`.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Monthly => date - Days::new(u64::from(date.day0())),
            Self::Annual => date - Days::new(u64::from(date.ordinal0())),
        }
    }

    /// Start of the period following the one starting at `start`.
    ///
    /// Returns `None` past the end of the representable calendar.
    pub fn next_period(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => start.succ_opt(),
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Annual => start.checked_add_months(Months::new(12)),
        }
    }

    /// Whether `self` has at least as many points per year as `other`.
    pub fn is_at_least_as_fine_as(&self, other: Self) -> bool {
        *self <= other
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "d" => Ok(Self::Daily),
            "monthly" | "m" | "ms" => Ok(Self::Monthly),
            "annual" | "yearly" | "y" | "a" => Ok(Self::Annual),
            other => Err(format!("Unknown frequency: {}", other)),
        }
    }
}

/// How a series is moved onto a target grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplePolicy {
    /// Carry each observation forward to every finer grid date until the next one
    #[default]
    ExpandForwardFill,
    /// Final observation of each target period (levels and prices)
    LastOfPeriod,
    /// Arithmetic mean of each target period (rates and yields)
    MeanOfPeriod,
}

impl ResamplePolicy {
    /// Lowercase name used in errors and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExpandForwardFill => "expand_forward_fill",
            Self::LastOfPeriod => "last_of_period",
            Self::MeanOfPeriod => "mean_of_period",
        }
    }

    /// Whether the policy can move a `native` series onto a `target` grid.
    pub fn supports(&self, native: Frequency, target: Frequency) -> bool {
        match self {
            Self::ExpandForwardFill => target.is_at_least_as_fine_as(native),
            Self::LastOfPeriod | Self::MeanOfPeriod => native.is_at_least_as_fine_as(target),
        }
    }
}

impl fmt::Display for ResamplePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(Frequency::Daily, date(2024, 2, 29), date(2024, 2, 29))]
    #[case(Frequency::Monthly, date(2024, 2, 29), date(2024, 2, 1))]
    #[case(Frequency::Monthly, date(2024, 3, 1), date(2024, 3, 1))]
    #[case(Frequency::Annual, date(2024, 12, 31), date(2024, 1, 1))]
    fn test_period_start(
        #[case] frequency: Frequency,
        #[case] input: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(frequency.period_start(input), expected);
    }

    #[test]
    fn test_next_period() {
        assert_eq!(
            Frequency::Daily.next_period(date(2023, 12, 31)),
            Some(date(2024, 1, 1))
        );
        assert_eq!(
            Frequency::Monthly.next_period(date(2024, 1, 1)),
            Some(date(2024, 2, 1))
        );
        assert_eq!(
            Frequency::Annual.next_period(date(2024, 1, 1)),
            Some(date(2025, 1, 1))
        );
    }

    #[test]
    fn test_ordering() {
        assert!(Frequency::Daily.is_at_least_as_fine_as(Frequency::Monthly));
        assert!(Frequency::Monthly.is_at_least_as_fine_as(Frequency::Monthly));
        assert!(!Frequency::Annual.is_at_least_as_fine_as(Frequency::Daily));
    }

    #[test]
    fn test_policy_support() {
        let expand = ResamplePolicy::ExpandForwardFill;
        assert!(expand.supports(Frequency::Monthly, Frequency::Daily));
        assert!(!expand.supports(Frequency::Daily, Frequency::Monthly));

        let mean = ResamplePolicy::MeanOfPeriod;
        assert!(mean.supports(Frequency::Daily, Frequency::Monthly));
        assert!(mean.supports(Frequency::Monthly, Frequency::Monthly));
        assert!(!mean.supports(Frequency::Annual, Frequency::Monthly));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Daily".parse::<Frequency>(), Ok(Frequency::Daily));
        assert_eq!("MS".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert!("weekly".parse::<Frequency>().is_err());
    }
}
