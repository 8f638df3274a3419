//! Query partitioning
//!
//! Splits an ordered list of selector values (reporter codes, partner codes,
//! periods) into comma-joined batches small enough to stay under the API's
//! 50,000-row cap. The final batch carries the remainder, so callers never
//! special-case the tail.
//!
//! Batch sizes were chosen empirically for six-digit commodity queries:
//! - reporters: [`REPORTER_BATCH_SIZE`]
//! - periods: [`PERIOD_BATCH_SIZE`]
//! - partners: [`PARTNER_BATCH_SIZE`]

use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

/// Reporters per request when a single partner is fixed
pub const REPORTER_BATCH_SIZE: usize = 5;

/// Periods per request for monthly single-reporter jobs
pub const PERIOD_BATCH_SIZE: usize = 3;

/// Partners per request for single-reporter jobs
pub const PARTNER_BATCH_SIZE: usize = 5;

/// Partitioning errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PartitionError {
    /// Batch size of zero would never make progress
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    /// Unparseable or out-of-range period
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Period range with start after end
    #[error("period range is reversed: {start} > {end}")]
    ReversedRange {
        /// Range start
        start: String,
        /// Range end
        end: String,
    },
}

/// Result type for partitioning
pub type PartitionResult<T> = Result<T, PartitionError>;

/// Split `values` into comma-joined batches of up to `batch_size` consecutive items.
///
/// Input order is preserved, all batches hold exactly `batch_size` values except
/// possibly the last one, and an empty input yields no batches.
pub fn partition<S: AsRef<str>>(values: &[S], batch_size: usize) -> PartitionResult<Vec<String>> {
    if batch_size == 0 {
        return Err(PartitionError::ZeroBatchSize);
    }

    Ok(values
        .chunks(batch_size)
        .map(|chunk| {
            chunk
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect())
}

/// Pair every `outer` batch with every `inner` batch, `outer` varying slowest.
pub fn cross_product(outer: &[String], inner: &[String]) -> Vec<(String, String)> {
    outer
        .iter()
        .flat_map(|o| inner.iter().map(move |i| (o.clone(), i.clone())))
        .collect()
}

/// Calendar month used for monthly period selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, rejecting months outside 1-12 and years outside 1900-9999
    pub fn new(year: i32, month: u32) -> PartitionResult<Self> {
        if !(1..=12).contains(&month) || !(1900..=9999).contains(&year) {
            return Err(PartitionError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// Year component
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Period selector as sent to the API (`YYYYMM`)
    pub fn period(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// English month name, used in job completion messages
    pub fn month_name(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B").to_string())
            .unwrap_or_default()
    }

    /// Month of the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PartitionError;

    /// Accepts `YYYY-MM` or `YYYYMM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || PartitionError::InvalidPeriod(s.to_string());
        let (year, month) = match s.split_once('-') {
            Some((y, m)) => (y, m),
            None if s.len() == 6 => s.split_at(4),
            None => return Err(invalid()),
        };
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

/// Every month from `from` to `to` inclusive, as `YYYYMM` selectors
pub fn monthly_periods(from: YearMonth, to: YearMonth) -> PartitionResult<Vec<String>> {
    if from > to {
        return Err(PartitionError::ReversedRange {
            start: from.to_string(),
            end: to.to_string(),
        });
    }

    let mut periods = Vec::new();
    let mut current = from;
    while current <= to {
        periods.push(current.period());
        current = current.succ();
    }
    Ok(periods)
}

/// Every month from `from` to `to` inclusive
pub fn months_between(from: YearMonth, to: YearMonth) -> PartitionResult<Vec<YearMonth>> {
    if from > to {
        return Err(PartitionError::ReversedRange {
            start: from.to_string(),
            end: to.to_string(),
        });
    }

    let mut months = Vec::new();
    let mut current = from;
    while current <= to {
        months.push(current);
        current = current.succ();
    }
    Ok(months)
}

/// Every year from `from` to `to` inclusive, as `YYYY` selectors
pub fn annual_periods(from: i32, to: i32) -> PartitionResult<Vec<String>> {
    if from > to {
        return Err(PartitionError::ReversedRange {
            start: from.to_string(),
            end: to.to_string(),
        });
    }
    Ok((from..=to).map(|y| y.to_string()).collect())
}
