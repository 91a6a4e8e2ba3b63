//! Core data types for dashboard observations

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::ClockTime;
use crate::units::{percent_of_goal, UnitError};

/// Label format for date-keyed points and window starts
pub const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// Label format for sub-daily points (weather)
pub const DATETIME_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Anything the bucketing engine can place on a calendar
pub trait Observation {
    fn timestamp(&self) -> NaiveDateTime;

    /// X-axis label when the observation is plotted unaggregated
    fn label(&self) -> String {
        self.timestamp().date().format(DATE_LABEL_FORMAT).to_string()
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// One record of a per-day weather log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherObservation {
    pub timestamp: NaiveDateTime,

    /// Indoor temperature (°C)
    pub temperature: Option<f64>,

    /// Indoor relative humidity (%)
    pub humidity: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<OutdoorConditions>,
}

impl WeatherObservation {
    pub fn outdoor_temperature_kelvin(&self) -> Option<f64> {
        self.weather_data
            .as_ref()
            .and_then(|w| w.current_temperature)
    }

    pub fn outdoor_humidity(&self) -> Option<f64> {
        self.weather_data.as_ref().and_then(|w| w.humidity)
    }
}

impl Observation for WeatherObservation {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn label(&self) -> String {
        self.timestamp.format(DATETIME_LABEL_FORMAT).to_string()
    }
}

/// Outdoor conditions nested in a weather record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutdoorConditions {
    /// Outdoor temperature (K)
    #[serde(default)]
    pub current_temperature: Option<f64>,

    #[serde(default, alias = "current_humidity")]
    pub humidity: Option<f64>,

    #[serde(default, alias = "conditions")]
    pub description: Option<String>,

    /// Forecast and any other provider fields, kept verbatim
    #[serde(flatten)]
    pub forecast: serde_json::Map<String, serde_json::Value>,
}

/// Daily step count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    pub date: NaiveDate,
    pub steps: u32,
}

impl Observation for StepRecord {
    fn timestamp(&self) -> NaiveDateTime {
        midnight(self.date)
    }
}

/// Discriminator column of the bedtime log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Bedtime,
    Wakeup,
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedtime" => Ok(EventKind::Bedtime),
            "wakeup" => Ok(EventKind::Wakeup),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// One row of the bedtime log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BedtimeEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub time: ClockTime,
}

/// Bedtime and wakeup correlated under one date label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NightRecord {
    pub date: NaiveDate,
    pub bedtime: Option<ClockTime>,
    pub wakeup: Option<ClockTime>,
}

impl Observation for NightRecord {
    fn timestamp(&self) -> NaiveDateTime {
        midnight(self.date)
    }
}

/// A night with the derived hours slept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SleepNight {
    pub date: NaiveDate,
    pub bedtime: Option<ClockTime>,
    pub wakeup: Option<ClockTime>,
    pub hours_slept: Option<f64>,
}

impl Observation for SleepNight {
    fn timestamp(&self) -> NaiveDateTime {
        midnight(self.date)
    }
}

/// Daily average release year of listened tracks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpotifyPoint {
    pub date: NaiveDate,
    pub average_release_year: f64,
}

impl Observation for SpotifyPoint {
    fn timestamp(&self) -> NaiveDateTime {
        midnight(self.date)
    }
}

/// Track count for one playlist genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub track_count: usize,
}

/// An aggregated value at a window start; re-bucketable like any observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AggregatePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation for AggregatePoint {
    fn timestamp(&self) -> NaiveDateTime {
        midnight(self.date)
    }
}

/// Legacy current-conditions snapshot (`data.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurrentConditions {
    #[serde(default)]
    pub temperature_in: Option<Reading>,
    #[serde(default)]
    pub temperature_out: Option<Reading>,
    #[serde(default)]
    pub humidity_in: Option<Reading>,
    #[serde(default)]
    pub humidity_out: Option<Reading>,
    #[serde(default)]
    pub steps: Option<Reading>,
}

impl CurrentConditions {
    /// Today's steps as a percentage of the goal, if the count is readable
    pub fn steps_percent_of_goal(&self, divisor: f64) -> Result<Option<f64>, UnitError> {
        self.steps
            .as_ref()
            .and_then(Reading::as_f64)
            .map(|steps| percent_of_goal(steps, divisor))
            .transpose()
    }
}

/// A snapshot value, written either as a number or a string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Reading {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Float(v) => Some(*v),
            Reading::Integer(v) => Some(*v as f64),
            // Counts may carry thousands separators ("8,123")
            Reading::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }
}

/// View selector shared by every time-series chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}
