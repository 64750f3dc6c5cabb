//! Service-time arithmetic.
//!
//! GTFS expresses stop times as `HH:MM:SS` relative to "service midnight",
//! and permits hours of 24 and above for trips that run past midnight
//! (`25:10:00` is ten past one the next morning). This module keeps such
//! times as plain seconds-since-service-midnight integers, preserving the
//! overflow internally; wrapping to a 24-hour wall clock happens only when
//! rendering output.

use std::fmt;
use std::ops::Add;

/// Seconds in one service day.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day in seconds since local service midnight.
///
/// Values may exceed one day; ordering and arithmetic are plain integer
/// operations on the underlying seconds.
///
/// # Examples
///
/// ```
/// use transit_server::domain::ServiceTime;
///
/// let t = ServiceTime::parse("08:15:30").unwrap();
/// assert_eq!(t.seconds(), 8 * 3600 + 15 * 60 + 30);
///
/// // Hours past midnight are preserved.
/// let late = ServiceTime::parse("25:10:00").unwrap();
/// assert_eq!(late.to_string(), "25:10:00");
/// assert_eq!(late.wall_clock(), "01:10:00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Creates a time from raw seconds since service midnight.
    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Returns the underlying seconds since service midnight.
    pub fn seconds(self) -> u32 {
        self.0
    }

    /// Parse an `HH:MM:SS` (or `HH:MM`) string.
    ///
    /// Hours of 24 and above are accepted, up to 48; minutes and seconds
    /// must be below 60.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.split(':');

        let hours = parse_component(parts.next(), "missing hours")?;
        let minutes = parse_component(parts.next(), "missing minutes")?;
        let seconds = match parts.next() {
            Some(sec) => parse_component(Some(sec), "invalid seconds")?,
            None => 0,
        };

        if parts.next().is_some() {
            return Err(TimeError::new("too many components"));
        }
        if hours > 48 {
            return Err(TimeError::new("hours must be 0-48"));
        }
        if minutes > 59 {
            return Err(TimeError::new("minutes must be 0-59"));
        }
        if seconds > 59 {
            return Err(TimeError::new("seconds must be 0-59"));
        }

        Ok(Self((hours * 60 + minutes) * 60 + seconds))
    }

    /// Renders the time wrapped to a 24-hour wall clock.
    ///
    /// This is the canonical output form: `25:10:00` renders as `01:10:00`.
    pub fn wall_clock(self) -> String {
        let s = self.0 % SECONDS_PER_DAY;
        format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
    }
}

impl Add<u32> for ServiceTime {
    type Output = Self;

    fn add(self, rhs: u32) -> Self {
        Self(self.0 + rhs)
    }
}

impl fmt::Display for ServiceTime {
    /// Renders without wrapping: hours may exceed 23.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

fn parse_component(part: Option<&str>, reason: &'static str) -> Result<u32, TimeError> {
    let part = part.ok_or_else(|| TimeError::new(reason))?;
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("expected one or two digits"));
    }
    part.parse().map_err(|_| TimeError::new(reason))
}

/// Duration in seconds from `dep` to `arr`, wrap-aware.
///
/// If `arr` is numerically before `dep` the arrival is taken to be on the
/// next service day.
pub fn wrap_aware_duration(dep: ServiceTime, arr: ServiceTime) -> u32 {
    if arr.0 < dep.0 {
        arr.0 + SECONDS_PER_DAY - dep.0
    } else {
        arr.0 - dep.0
    }
}
