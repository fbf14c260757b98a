//! Splitting a requested day range into query-sized chunks.
//!
//! The audit API caps the span of a single `listEvents` query, so a long
//! export is issued as a series of consecutive windows. Ranges are half-open
//! `[start, end)`: the end of a range given as days is midnight *after* the
//! last requested day, which covers that day through its final instant and
//! matches the API's exclusive `endTime`.

use crate::error::{Error, Result};
use crate::utils::time::{format_timestamp, parse_day};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Query window used when none is configured.
pub const DEFAULT_CHUNK_DAYS: i64 = 7;

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One query window of a [`TimeRange`].
pub type Chunk = TimeRange;

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "start {} is after end {}",
                format_timestamp(&start),
                format_timestamp(&end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Build the range covering `first_day` through the end of `last_day`.
    pub fn from_days(first_day: NaiveDate, last_day: NaiveDate) -> Result<Self> {
        if first_day > last_day {
            return Err(Error::InvalidRange(format!(
                "start date {} is after end date {}",
                first_day, last_day
            )));
        }
        let start = first_day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        let end = last_day
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());

        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(Error::InvalidRange(format!(
                "date {} is out of range",
                last_day
            ))),
        }
    }

    /// Parse two command-line dates into a range.
    pub fn parse(first_day: &str, last_day: &str) -> Result<Self> {
        let parse = |input: &str| {
            parse_day(input).ok_or_else(|| {
                Error::InvalidRange(format!(
                    "'{}' is not a valid date (expected YYYY-MM-DD, DD.MM.YYYY or DD.MM.YY)",
                    input
                ))
            })
        };
        Self::from_days(parse(first_day)?, parse(last_day)?)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Last calendar day touched by the range.
    pub fn last_day(&self) -> NaiveDate {
        if self.end > self.start {
            (self.end - Duration::nanoseconds(1)).date_naive()
        } else {
            self.start.date_naive()
        }
    }

    /// Split into consecutive chunks of at most `max_span`.
    pub fn chunks(&self, max_span: Duration) -> Result<Chunks> {
        if max_span <= Duration::zero() {
            return Err(Error::InvalidRange(format!(
                "chunk span must be positive, got {} seconds",
                max_span.num_seconds()
            )));
        }
        Ok(Chunks {
            next_start: self.start,
            end: self.end,
            max_span,
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.date_naive(), self.last_day())
    }
}

/// A chunk span of `days` whole days, rejected when it does not fit a `Duration`.
pub fn span_days(days: i64) -> Result<Duration> {
    Duration::try_days(days)
        .ok_or_else(|| Error::InvalidRange(format!("chunk span of {} days is too large", days)))
}

/// Parse `first_day`/`last_day` and split the range into `max_span_days` windows.
pub fn split_range(first_day: &str, last_day: &str, max_span_days: i64) -> Result<Chunks> {
    TimeRange::parse(first_day, last_day)?.chunks(span_days(max_span_days)?)
}

/// Lazy iterator over the chunks of a range.
///
/// Cloning yields an independent iterator from the same position, so a plan
/// can be walked more than once (e.g. counted for a progress bar, then run).
#[derive(Debug, Clone)]
pub struct Chunks {
    next_start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next_start >= self.end {
            return None;
        }
        let start = self.next_start;
        let end = match start.checked_add_signed(self.max_span) {
            Some(candidate) if candidate < self.end => candidate,
            _ => self.end,
        };
        self.next_start = end;
        Some(TimeRange { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next_start;
        if remaining <= Duration::zero() {
            return (0, Some(0));
        }
        let span = i128::from(self.max_span.num_milliseconds().max(1));
        let left = i128::from(remaining.num_milliseconds());
        let count = usize::try_from((left + span - 1) / span).unwrap_or(usize::MAX);
        (count, Some(count))
    }
}

impl ExactSizeIterator for Chunks {}
