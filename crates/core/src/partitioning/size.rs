use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::{PartitioningError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePartitionUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
}

impl TimePartitionUnit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Years => "years",
            Self::Months => "months",
            Self::Weeks => "weeks",
            Self::Days => "days",
            Self::Hours => "hours",
        }
    }

    /// Default partition name format for buckets of this unit.
    #[must_use]
    pub const fn name_format(self) -> &'static str {
        match self {
            Self::Years => "%Y",
            Self::Months => "%Y_%b",
            Self::Weeks => "%Y_week_%W",
            Self::Days => "%Y_%b_%d",
            Self::Hours => "%Y_%b_%d_%H",
        }
    }
}

impl fmt::Display for TimePartitionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width of a time bucket, e.g. one month or three days.
///
/// Buckets wider than one unit are aligned to an anchor (the Unix epoch
/// unless overridden) so boundaries do not depend on when a strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePartitionSize {
    unit: TimePartitionUnit,
    value: u32,
    anchor: NaiveDateTime,
}

impl TimePartitionSize {
    pub fn new(unit: TimePartitionUnit, value: u32) -> Result<Self> {
        if value == 0 {
            return Err(invalid_size("Partition cannot be 0 in size."));
        }

        Ok(Self {
            unit,
            value,
            anchor: DateTime::UNIX_EPOCH.naive_utc(),
        })
    }

    pub fn years(value: u32) -> Result<Self> {
        Self::new(TimePartitionUnit::Years, value)
    }

    pub fn months(value: u32) -> Result<Self> {
        Self::new(TimePartitionUnit::Months, value)
    }

    pub fn weeks(value: u32) -> Result<Self> {
        Self::new(TimePartitionUnit::Weeks, value)
    }

    pub fn days(value: u32) -> Result<Self> {
        Self::new(TimePartitionUnit::Days, value)
    }

    pub fn hours(value: u32) -> Result<Self> {
        Self::new(TimePartitionUnit::Hours, value)
    }

    /// Builds a size from optional per-unit amounts. Exactly one must be set
    /// to a non-zero value.
    pub fn from_parts(
        years: Option<u32>,
        months: Option<u32>,
        weeks: Option<u32>,
        days: Option<u32>,
        hours: Option<u32>,
    ) -> Result<Self> {
        let parts = [
            (TimePartitionUnit::Years, years),
            (TimePartitionUnit::Months, months),
            (TimePartitionUnit::Weeks, weeks),
            (TimePartitionUnit::Days, days),
            (TimePartitionUnit::Hours, hours),
        ];
        let mut set = parts
            .into_iter()
            .filter_map(|(unit, value)| value.filter(|value| *value > 0).map(|value| (unit, value)));

        let Some((unit, value)) = set.next() else {
            return Err(invalid_size("Partition cannot be 0 in size."));
        };
        if set.next().is_some() {
            return Err(invalid_size("Partition can only have on size unit."));
        }

        Self::new(unit, value)
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: NaiveDateTime) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub const fn unit(&self) -> TimePartitionUnit {
        self.unit
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub const fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// Start of the bucket `dt` falls into.
    #[must_use]
    pub fn start(&self, dt: NaiveDateTime) -> NaiveDateTime {
        let truncated = truncate(self.unit, dt);
        if self.value == 1 {
            return truncated;
        }

        let anchor = truncate(self.unit, self.anchor);
        let elapsed = units_between(self.unit, anchor, truncated);
        let aligned = elapsed.div_euclid(i64::from(self.value)) * i64::from(self.value);
        shift(self.unit, anchor, aligned)
    }

    #[must_use]
    pub fn advance(&self, dt: NaiveDateTime) -> NaiveDateTime {
        shift(self.unit, dt, i64::from(self.value))
    }

    #[must_use]
    pub fn rewind(&self, dt: NaiveDateTime) -> NaiveDateTime {
        shift(self.unit, dt, -i64::from(self.value))
    }
}

impl fmt::Display for TimePartitionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

fn truncate(unit: TimePartitionUnit, dt: NaiveDateTime) -> NaiveDateTime {
    let date = dt.date();
    match unit {
        TimePartitionUnit::Years => midnight(
            NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        ),
        TimePartitionUnit::Months => midnight(date.with_day(1).unwrap_or(date)),
        TimePartitionUnit::Weeks => midnight(
            date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday())),
        ),
        TimePartitionUnit::Days => midnight(date),
        TimePartitionUnit::Hours => {
            date.and_time(NaiveTime::from_hms_opt(dt.hour(), 0, 0).unwrap_or(NaiveTime::MIN))
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn units_between(unit: TimePartitionUnit, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    match unit {
        TimePartitionUnit::Years => i64::from(to.year() - from.year()),
        TimePartitionUnit::Months => {
            let from_months = i64::from(from.year()) * 12 + i64::from(from.month0());
            let to_months = i64::from(to.year()) * 12 + i64::from(to.month0());
            to_months - from_months
        }
        TimePartitionUnit::Weeks => (to - from).num_days().div_euclid(7),
        TimePartitionUnit::Days => (to - from).num_days(),
        TimePartitionUnit::Hours => (to - from).num_hours(),
    }
}

fn shift(unit: TimePartitionUnit, dt: NaiveDateTime, amount: i64) -> NaiveDateTime {
    match unit {
        TimePartitionUnit::Years => shift_months(dt, amount.saturating_mul(12)),
        TimePartitionUnit::Months => shift_months(dt, amount),
        TimePartitionUnit::Weeks => dt + TimeDelta::weeks(amount),
        TimePartitionUnit::Days => dt + TimeDelta::days(amount),
        TimePartitionUnit::Hours => dt + TimeDelta::hours(amount),
    }
}

fn shift_months(dt: NaiveDateTime, amount: i64) -> NaiveDateTime {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).unwrap_or(u32::MAX));
    let shifted = if amount >= 0 {
        dt.checked_add_months(months)
    } else {
        dt.checked_sub_months(months)
    };
    shifted.unwrap_or(dt)
}

fn invalid_size(message: &str) -> crate::Error {
    PartitioningError::InvalidSize {
        message: message.to_string(),
    }
    .into()
}
