//! Reporting periods and the calendar buckets they are charted in.
//!
//! All boundaries are computed on the UTC calendar. Buckets are half-open
//! `[start, end)` intervals laid end to end, so an instant always falls in at
//! most one of them.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Error)]
#[error("unknown period '{0}'")]
pub struct ParsePeriodError(String);

impl Period {
    /// Reads the `period` query value. Missing or unrecognised values fall
    /// back to [`Period::Monthly`].
    pub fn from_query(value: Option<&str>) -> Self {
        value
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub const fn bucket_count(self) -> usize {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 12,
            Self::Yearly => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    fn label_format(self) -> &'static str {
        match self {
            Self::Weekly => "%a",
            Self::Monthly => "%b %Y",
            Self::Yearly => "%Y",
        }
    }

    /// First day of the unit `offset` steps away from the unit holding
    /// `today` (negative is earlier).
    fn unit_start(self, today: NaiveDate, offset: i32) -> Option<NaiveDate> {
        match self {
            Self::Weekly => today.checked_add_signed(Duration::days(i64::from(offset))),
            Self::Monthly => {
                let index = today.year() * 12 + today.month0() as i32 + offset;
                let month = index.rem_euclid(12) as u32 + 1;
                NaiveDate::from_ymd_opt(index.div_euclid(12), month, 1)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(today.year() + offset, 1, 1),
        }
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(ParsePeriodError(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// The span covered by a bucket sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Builds the chart buckets for `period`, oldest first, the last one holding
/// `now`.
pub fn buckets(period: Period, now: DateTime<Utc>) -> Vec<Bucket> {
    let today = now.date_naive();
    let newest = period.bucket_count() as i32 - 1;

    let starts: Vec<DateTime<Utc>> = (-newest..=1)
        .filter_map(|offset| period.unit_start(today, offset))
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .collect();

    starts
        .windows(2)
        .map(|pair| Bucket {
            label: pair[0].format(period.label_format()).to_string(),
            start: pair[0],
            end: pair[1],
        })
        .collect()
}

pub fn window(buckets: &[Bucket]) -> Option<Window> {
    Some(Window {
        start: buckets.first()?.start,
        end: buckets.last()?.end,
    })
}

/// Index of the bucket containing `at`, by binary search over the starts.
pub fn bucket_index(buckets: &[Bucket], at: DateTime<Utc>) -> Option<usize> {
    let after = buckets.partition_point(|bucket| bucket.start <= at);
    let index = after.checked_sub(1)?;
    buckets[index].contains(at).then_some(index)
}
