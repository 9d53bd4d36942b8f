//! Calendar periods used to bucket quality measure records
//!
//! This module defines the three aggregation granularities and the
//! [`TimePeriod`] type that moves between dates, storage labels and
//! display labels. Storage labels are what the aggregator groups on:
//!
//! - Year: `"2024"`
//! - Quarter: `"2024-3"`
//! - Month: `"2024-07"`
//!
//! Quarter labels gain an explicit `Q` marker (`"2024-Q3"`) only when
//! rendered for display.

pub mod decompose;
pub mod sort;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};

pub use decompose::add_period_columns;
pub use sort::sort_by_period;

/// Aggregation granularity of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    /// Calendar month
    Month,
    /// Calendar quarter
    Quarter,
    /// Calendar year
    Year,
}

impl Frequency {
    /// All granularities in output order
    pub const ALL: [Frequency; 3] = [Frequency::Month, Frequency::Quarter, Frequency::Year];

    /// The tag stored in the `frequency` column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Frequency::Month => "Month",
            Frequency::Quarter => "Quarter",
            Frequency::Year => "Year",
        }
    }

    /// Name of the period column produced by the decomposer for this granularity
    #[must_use]
    pub const fn period_column(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = SpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(Frequency::Month),
            "quarter" => Ok(Frequency::Quarter),
            "year" => Ok(Frequency::Year),
            other => Err(SpcError::Config(format!("Unknown frequency: {other}"))),
        }
    }
}

/// A calendar period at one granularity
///
/// Ordering is only meaningful between periods of the same granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimePeriod {
    /// Yearly period (e.g. 2020)
    Year(i32),
    /// Quarterly period: year, quarter (1-4)
    Quarter(i32, u32),
    /// Monthly period: year, month (1-12)
    Month(i32, u32),
}

impl TimePeriod {
    /// Get the period of the given granularity that contains `date`
    #[must_use]
    pub fn from_date(date: &NaiveDate, frequency: Frequency) -> Self {
        match frequency {
            Frequency::Month => TimePeriod::Month(date.year(), date.month()),
            Frequency::Quarter => TimePeriod::Quarter(date.year(), (date.month() - 1) / 3 + 1),
            Frequency::Year => TimePeriod::Year(date.year()),
        }
    }

    /// Granularity of this period
    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        match self {
            TimePeriod::Year(_) => Frequency::Year,
            TimePeriod::Quarter(..) => Frequency::Quarter,
            TimePeriod::Month(..) => Frequency::Month,
        }
    }

    /// Sort key used for chronological ordering: (year, sub-period)
    ///
    /// Years use a sub-period of zero.
    #[must_use]
    pub const fn sort_key(&self) -> (i32, u32) {
        match self {
            TimePeriod::Year(year) => (*year, 0),
            TimePeriod::Quarter(year, sub) | TimePeriod::Month(year, sub) => (*year, *sub),
        }
    }

    /// Storage label used while aggregating
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            TimePeriod::Year(year) => format!("{year}"),
            TimePeriod::Quarter(year, quarter) => format!("{year}-{quarter}"),
            TimePeriod::Month(year, month) => format!("{year}-{month:02}"),
        }
    }

    /// Human-readable label used in the final dataset
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            TimePeriod::Quarter(year, quarter) => format!("{year}-Q{quarter}"),
            other => other.label(),
        }
    }

    /// Parse a storage label back into a period of the given granularity
    ///
    /// Only the storage format of that granularity is accepted: a display
    /// label such as `"2024-Q3"` or a label of another granularity is an
    /// error.
    pub fn parse_label(label: &str, frequency: Frequency) -> Result<Self> {
        let invalid = || SpcError::PeriodLabel {
            label: label.to_string(),
            frequency,
        };

        match frequency {
            Frequency::Year => {
                let year = label.trim().parse::<i32>().map_err(|_| invalid())?;
                Ok(TimePeriod::Year(year))
            }
            Frequency::Quarter | Frequency::Month => {
                let (year, sub) = label.trim().rsplit_once('-').ok_or_else(invalid)?;
                let year = year.parse::<i32>().map_err(|_| invalid())?;
                let sub = sub.parse::<u32>().map_err(|_| invalid())?;
                let max = if frequency == Frequency::Quarter { 4 } else { 12 };
                if !(1..=max).contains(&sub) {
                    return Err(invalid());
                }
                Ok(if frequency == Frequency::Quarter {
                    TimePeriod::Quarter(year, sub)
                } else {
                    TimePeriod::Month(year, sub)
                })
            }
        }
    }

    /// Get the start date of this time period
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        match self {
            TimePeriod::Year(year) => NaiveDate::from_ymd_opt(*year, 1, 1),
            TimePeriod::Quarter(year, quarter) => {
                NaiveDate::from_ymd_opt(*year, quarter.checked_sub(1)? * 3 + 1, 1)
            }
            TimePeriod::Month(year, month) => NaiveDate::from_ymd_opt(*year, *month, 1),
        }
    }

    /// Get the end date of this time period (inclusive)
    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        let (year, last_month) = match self {
            TimePeriod::Year(year) => (*year, 12),
            TimePeriod::Quarter(year, quarter) => (*year, quarter * 3),
            TimePeriod::Month(year, month) => (*year, *month),
        };
        let next_month = if last_month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, last_month + 1, 1)
        };
        next_month.and_then(|d| d.pred_opt())
    }

    /// Check if this time period contains the given date
    #[must_use]
    pub fn contains(&self, date: &NaiveDate) -> bool {
        match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) => &start <= date && date <= &end,
            _ => false,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
