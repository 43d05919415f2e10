//! Wall-clock arithmetic for the production timeline.
//!
//! Every position on the timeline is a minute offset from the start of a
//! [`TimeWindow`]. The functions here are pure coordinate transforms; callers
//! clamp before or after calling them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::validation::ValidationError;

/// Default drag/snap granularity in minutes.
pub const DEFAULT_SNAP_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A time of day with minute resolution, stored as minutes since midnight.
///
/// Serialized as a 24-hour `"HH:MM"` string. `"24:00"` is accepted so a
/// window may run to the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u32);

impl ClockTime {
    pub fn from_minutes(minutes: u32) -> Self {
        ClockTime(minutes)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(ValidationError::InvalidClockTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(ClockTime(hour * 60 + minute))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minute(self) -> u32 {
        self.0 % 60
    }

    /// Saturates rather than wrapping; callers check the result against a window.
    pub fn plus_minutes(self, minutes: u32) -> Self {
        ClockTime(self.0.saturating_add(minutes))
    }

    /// Signed distance in minutes from `earlier` to `self`.
    pub fn minutes_since(self, earlier: ClockTime) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    /// Parse "HH:MM" (24-hour). A trailing ":SS" is tolerated and ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime(s.to_string());
        let trimmed = s.trim();
        let mut parts = trimmed.split(':');
        let hour = parts
            .next()
            .filter(|p| !p.is_empty() && p.len() <= 2)
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let minute = parts
            .next()
            .filter(|p| p.len() == 2)
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        if let Some(seconds) = parts.next() {
            if seconds.len() != 2 || seconds.parse::<u32>().is_err() {
                return Err(invalid());
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        ClockTime::from_hm(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// The bounded interval every task must fit inside. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: ClockTime,
    end: ClockTime,
}

impl TimeWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, ValidationError> {
        if start >= end || end.minutes() > MINUTES_PER_DAY {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    pub fn length_minutes(&self) -> u32 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn contains_range(&self, start: ClockTime, end: ClockTime) -> bool {
        self.start <= start && end <= self.end
    }
}

impl Default for TimeWindow {
    /// 06:00 to 17:00.
    fn default() -> Self {
        Self {
            start: ClockTime(6 * 60),
            end: ClockTime(17 * 60),
        }
    }
}

/// Minutes elapsed since `window.start`. Negative or past-the-end values are
/// returned as is.
pub fn time_to_offset(time: ClockTime, window: &TimeWindow) -> i64 {
    time.minutes_since(window.start)
}

/// Inverse of [`time_to_offset`], rounded half-up to the nearest multiple of
/// `snap_minutes` on the wall clock (a snap to :60 carries into the hour).
/// A snap of zero rounds to the nearest minute.
pub fn offset_to_time(offset_minutes: f64, window: &TimeWindow, snap_minutes: u32) -> ClockTime {
    let absolute = (window.start.minutes() as f64 + offset_minutes).max(0.0);
    let snap = snap_minutes.max(1) as f64;
    let snapped = (absolute / snap + 0.5).floor() * snap;
    ClockTime::from_minutes(snapped as u32)
}

/// Share of the window covered by `duration_minutes`, in `[0, 1]`. Layout only.
pub fn duration_to_proportion(duration_minutes: u32, window: &TimeWindow) -> f64 {
    (duration_minutes as f64 / window.length_minutes() as f64).clamp(0.0, 1.0)
}
