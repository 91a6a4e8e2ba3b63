//! Fetch-and-parse loaders
//!
//! Every loader degrades to an empty result: a missing or unreadable log is
//! logged and the chart renders without data.

use chrono::{Duration, NaiveDate};
use pulse_core::{
    CurrentConditions, GenreCount, LogSource, NightRecord, Resource, SpotifyPoint, StepRecord,
    WeatherObservation,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    correlate_nights, parse_bedtime_csv, parse_genre_dump, parse_snapshot,
    parse_spotify_year_log, parse_steps_csv, parse_weather_log, ParseResult,
};

async fn load<T>(
    source: &dyn LogSource,
    resource: Resource,
    parse: impl FnOnce(&str) -> ParseResult<T>,
) -> Option<T> {
    let raw = match source.fetch(&resource).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%resource, error = %e, "fetch failed");
            return None;
        }
    };
    match parse(&raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(%resource, error = %e, "parse failed");
            None
        }
    }
}

/// Fetch `days` day-logs ending at `today` concurrently and merge them in
/// timestamp order. Days without a log are skipped.
pub async fn load_weather(
    source: Arc<dyn LogSource>,
    days: u32,
    today: NaiveDate,
) -> Vec<WeatherObservation> {
    let mut fetches = JoinSet::new();
    for back in 0..i64::from(days) {
        let day = today - Duration::days(back);
        let source = Arc::clone(&source);
        fetches.spawn(async move {
            let fetched = source.fetch(&Resource::WeatherDay(day)).await;
            (day, fetched)
        });
    }

    let mut by_day = BTreeMap::new();
    while let Some(joined) = fetches.join_next().await {
        let (day, fetched) = match joined {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "weather fetch task failed");
                continue;
            }
        };
        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                debug!(%day, error = %e, "no weather log");
                continue;
            }
        };
        match parse_weather_log(&raw) {
            Ok(observations) => {
                by_day.insert(day, observations);
            }
            Err(e) => warn!(%day, error = %e, "skipping weather log"),
        }
    }

    let mut merged: Vec<WeatherObservation> = by_day.into_values().flatten().collect();
    merged.sort_by_key(|o| o.timestamp);
    debug!(days, records = merged.len(), "loaded weather");
    merged
}

/// Step records in date order
pub async fn load_steps(source: &dyn LogSource) -> Vec<StepRecord> {
    let mut records = load(source, Resource::Steps, |raw| Ok(parse_steps_csv(raw)))
        .await
        .unwrap_or_default();
    records.sort_by_key(|r| r.date);
    records
}

/// Bedtime log correlated into one record per date
pub async fn load_nights(source: &dyn LogSource) -> Vec<NightRecord> {
    load(source, Resource::Bedtime, |raw| {
        parse_bedtime_csv(raw).map(|events| correlate_nights(&events))
    })
    .await
    .unwrap_or_default()
}

/// Average-year points in date order
pub async fn load_spotify_year(source: &dyn LogSource) -> Vec<SpotifyPoint> {
    let mut points = load(source, Resource::SpotifyYear, |raw| {
        Ok(parse_spotify_year_log(raw))
    })
    .await
    .unwrap_or_default();
    points.sort_by_key(|p| p.date);
    points
}

pub async fn load_genres(source: &dyn LogSource) -> Vec<GenreCount> {
    load(source, Resource::SpotifyGenres, parse_genre_dump)
        .await
        .unwrap_or_default()
}

/// The snapshot, or `None` when it cannot be fetched or read
pub async fn load_snapshot(source: &dyn LogSource) -> Option<CurrentConditions> {
    load(source, Resource::Snapshot, parse_snapshot).await
}
