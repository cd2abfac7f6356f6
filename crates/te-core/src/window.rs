//! Trailing lookback windows.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Window validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// A zero-hour window would always be empty.
    #[error("lookback window must be at least one hour")]
    Empty,
}

/// A trailing window of `hours` ending at the scrape instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LookbackWindow {
    hours: u32,
}

impl LookbackWindow {
    /// Creates a window after validation.
    pub const fn new(hours: u32) -> Result<Self, WindowError> {
        if hours == 0 {
            return Err(WindowError::Empty);
        }
        Ok(Self { hours })
    }

    pub const fn hours(self) -> u32 {
        self.hours
    }

    /// The `timeframe` label value, e.g. `"24h"`.
    pub fn label(self) -> String {
        format!("{}h", self.hours)
    }

    /// The range `[now - hours, now]`.
    pub fn range_ending(self, now: DateTime<Utc>) -> TimeRange {
        TimeRange {
            start: now - Duration::hours(i64::from(self.hours)),
            end: now,
        }
    }
}

impl TryFrom<u32> for LookbackWindow {
    type Error = WindowError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LookbackWindow> for u32 {
    fn from(window: LookbackWindow) -> Self {
        window.hours
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours)
    }
}

/// A closed time range passed to the time-entries endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Query parameters for the time-entries endpoint.
    ///
    /// Both bounds are RFC 3339, truncated to whole seconds, with an explicit
    /// `+00:00` offset.
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("start_date", format_instant(self.start)),
            ("end_date", format_instant(self.end)),
        ]
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}
