//! Unit and display-format conversions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Step count that maps to 100% of the daily goal is `100 * divisor`
pub const DEFAULT_STEP_GOAL_DIVISOR: f64 = 50.0;

const KELVIN_OFFSET: f64 = 273.15;

/// Unit conversion error
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown temperature unit: {0}")]
    UnknownUnit(String),

    #[error("Step goal divisor must be positive, got {0}")]
    InvalidGoalDivisor(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            "k" | "kelvin" => Ok(TemperatureUnit::Kelvin),
            other => Err(UnitError::UnknownUnit(other.to_string())),
        }
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// C to F, rounded to one decimal
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round_to(celsius * 9.0 / 5.0 + 32.0, 1)
}

/// K to F via Celsius, rounded to one decimal
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    celsius_to_fahrenheit(kelvin - KELVIN_OFFSET)
}

/// Convert a temperature between units, rounding to one decimal
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    if from == to {
        return round_to(value, 1);
    }

    let celsius = match from {
        TemperatureUnit::Celsius => value,
        TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        TemperatureUnit::Kelvin => value - KELVIN_OFFSET,
    };

    match to {
        TemperatureUnit::Celsius => round_to(celsius, 1),
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        TemperatureUnit::Kelvin => round_to(celsius + KELVIN_OFFSET, 1),
    }
}

/// 7.5 -> "07:30"
///
/// Minutes that round up to 60 carry into the hour, and the hour wraps
/// past midnight.
pub fn decimal_hours_to_clock(hours: f64) -> String {
    let mut whole = hours.floor();
    let mut minutes = ((hours - whole) * 60.0).round();
    if minutes >= 60.0 {
        whole += 1.0;
        minutes = 0.0;
    }
    format!("{:02}:{:02}", (whole as i64).rem_euclid(24), minutes as i64)
}

/// Steps as a percentage of the goal, e.g. 5000 steps / 50 = 100%
pub fn percent_of_goal(steps: f64, divisor: f64) -> Result<f64, UnitError> {
    if divisor <= 0.0 || !divisor.is_finite() {
        return Err(UnitError::InvalidGoalDivisor(divisor));
    }
    Ok(steps / divisor)
}
