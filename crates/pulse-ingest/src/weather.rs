//! Per-day weather log parser
//!
//! A day file is a run of JSON objects, each followed by a comma, with no
//! enclosing brackets. The trailing separator is stripped and the text is
//! wrapped into an array before parsing.

use pulse_core::{parse_timestamp, OutdoorConditions, WeatherObservation};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ParseError, ParseResult};

#[derive(Debug, Deserialize)]
struct RawWeatherRecord {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    weather_data: Option<OutdoorConditions>,
}

/// Repair the day-file text into a JSON array literal
fn to_json_array(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return trimmed.to_string();
    }

    let body = match trimmed.chars().last() {
        Some('}') | Some(']') | None => trimmed,
        Some(stray) => &trimmed[..trimmed.len() - stray.len_utf8()],
    };
    format!("[{body}]")
}

/// Parse one weather day-log.
///
/// Records missing a usable `timestamp` are dropped. The result is sorted
/// by timestamp (stable, so duplicates keep file order).
pub fn parse_weather_log(raw: &str) -> ParseResult<Vec<WeatherObservation>> {
    let text = to_json_array(raw);
    let values: Value =
        serde_json::from_str(&text).map_err(|e| ParseError::MalformedWeatherLog(e.to_string()))?;
    let Value::Array(records) = values else {
        return Err(ParseError::MalformedWeatherLog(
            "expected a sequence of records".into(),
        ));
    };

    let total = records.len();
    let mut observations: Vec<WeatherObservation> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match to_observation(value) {
            Ok(obs) => Some(obs),
            Err(reason) => {
                warn!(record = idx, %reason, "dropping weather record");
                None
            }
        })
        .collect();

    observations.sort_by_key(|o| o.timestamp);
    debug!(kept = observations.len(), total, "parsed weather log");
    Ok(observations)
}

fn to_observation(value: Value) -> Result<WeatherObservation, String> {
    let raw: RawWeatherRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let stamp = raw.timestamp.ok_or("missing timestamp")?;
    let timestamp = parse_timestamp(&stamp).ok_or_else(|| format!("bad timestamp {stamp:?}"))?;

    Ok(WeatherObservation {
        timestamp,
        temperature: raw.temperature,
        humidity: raw.humidity,
        weather_data: raw.weather_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{bucket, BucketPolicy, Granularity};

    const DAY_LOG: &str = r#"{"timestamp": "2023-05-08 00:05:01", "temperature": 21.0, "humidity": 40.0, "weather_data": {"current_temperature": 283.15, "humidity": 80, "description": "clear sky"}},
{"timestamp": "2023-05-08 00:10:01", "temperature": 21.5, "humidity": 41.0, "weather_data": {"current_temperature": 283.0}},
{"timestamp": "2023-05-08 00:15:01", "temperature": 21.4, "humidity": 41.0},
"#;

    #[test]
    fn test_parses_day_log_with_trailing_separator() {
        let obs = parse_weather_log(DAY_LOG).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].outdoor_temperature_kelvin(), Some(283.15));
        assert_eq!(obs[2].weather_data, None);
    }

    #[test]
    fn test_daily_bucket_keeps_every_record_in_order() {
        let obs = parse_weather_log(DAY_LOG).unwrap();
        let now = obs[0].timestamp;
        let buckets = bucket(
            &obs,
            Granularity::Daily,
            &BucketPolicy::weather(chrono::Weekday::Sun, None),
            now,
        );

        assert_eq!(buckets.len(), 3);
        assert!(buckets
            .windows(2)
            .all(|w| w[0].members[0].timestamp <= w[1].members[0].timestamp));
    }

    #[test]
    fn test_record_without_timestamp_is_dropped() {
        let log = r#"{"timestamp": "2023-05-08 00:05:01", "temperature": 21.0},
{"temperature": 22.0},
{"timestamp": "2023-05-08 00:15:01", "temperature": 23.0},"#;
        let obs = parse_weather_log(log).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].temperature, Some(23.0));
    }

    #[test]
    fn test_out_of_order_records_are_sorted() {
        let log = r#"{"timestamp": "2023-05-08T10:00:00", "temperature": 2.0},
{"timestamp": "2023-05-08T09:00:00", "temperature": 1.0},"#;
        let obs = parse_weather_log(log).unwrap();
        assert_eq!(obs[0].temperature, Some(1.0));
    }

    #[test]
    fn test_malformed_text_fails() {
        assert!(matches!(
            parse_weather_log("{\"timestamp\": "),
            Err(ParseError::MalformedWeatherLog(_))
        ));
    }

    #[test]
    fn test_empty_and_bracketed_inputs() {
        assert!(parse_weather_log("").unwrap().is_empty());

        let bracketed = r#"[{"timestamp": "2023-05-08 00:05:01"}]"#;
        assert_eq!(parse_weather_log(bracketed).unwrap().len(), 1);
    }
}
