//! Clock times and lenient timestamp parsing for log inputs

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock time: {0:?}")]
pub struct ClockParseError(pub String);

impl ClockTime {
    /// `minutes` wraps modulo one day
    pub fn from_minutes(minutes: u32) -> Self {
        Self((minutes % u32::from(MINUTES_PER_DAY)) as u16)
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self((hours * 60 + minutes) as u16))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// 07:30 -> 7.5
    pub fn as_decimal_hours(self) -> f64 {
        f64::from(self.0) / 60.0
    }
}

impl FromStr for ClockTime {
    type Err = ClockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split(':');
        let parse = |p: Option<&str>| p.and_then(|v| v.trim().parse::<u32>().ok());

        let hours = parse(parts.next());
        let minutes = parse(parts.next());
        // Seconds are accepted and dropped
        if let Some(sec) = parts.next() {
            if sec.trim().parse::<u32>().map_or(true, |v| v >= 60) {
                return Err(ClockParseError(s.to_string()));
            }
        }
        if parts.next().is_some() {
            return Err(ClockParseError(s.to_string()));
        }

        match (hours, minutes) {
            (Some(h), Some(m)) => {
                ClockTime::from_hm(h, m).ok_or_else(|| ClockParseError(s.to_string()))
            }
            _ => Err(ClockParseError(s.to_string())),
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a log timestamp into local wall-clock time.
///
/// Accepts RFC 3339 (offset kept as wall time), ISO-like datetimes with a
/// `T` or space separator, and bare dates (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)))
}

/// Parse a calendar date in any of the accepted layouts
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
