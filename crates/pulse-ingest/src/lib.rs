//! Log parsers, sources and loaders
//!
//! Parsers turn the raw text of each log format into typed observations
//! from `pulse-core`. A bad row is logged and skipped; only a log that is
//! unusable as a whole fails the parse. Loaders pair a [`LogSource`] with a
//! parser and degrade to an empty sequence on any failure.
//!
//! [`LogSource`]: pulse_core::LogSource

pub mod bedtime;
pub mod loader;
pub mod snapshot;
pub mod source;
pub mod spotify;
pub mod steps;
pub mod weather;

pub use bedtime::*;
pub use loader::*;
pub use snapshot::*;
pub use source::*;
pub use spotify::*;
pub use steps::*;
pub use weather::*;

use pulse_core::{
    CurrentConditions, GenreCount, NightRecord, SpotifyPoint, StepRecord, WeatherObservation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed weather log: {0}")]
    MalformedWeatherLog(String),

    #[error("Malformed row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Bedtime log header is missing column {0:?}")]
    MalformedBedtimeHeader(&'static str),

    #[error("Malformed genre dump: {0}")]
    MalformedGenreDump(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Log formats understood by [`parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Weather,
    Steps,
    Bedtime,
    SpotifyYear,
    SpotifyGenres,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLog {
    Weather(Vec<WeatherObservation>),
    Steps(Vec<StepRecord>),
    Bedtime(Vec<NightRecord>),
    SpotifyYear(Vec<SpotifyPoint>),
    SpotifyGenres(Vec<GenreCount>),
    Snapshot(CurrentConditions),
}

/// Parse raw text for one domain
pub fn parse(domain: Domain, raw: &str) -> ParseResult<ParsedLog> {
    Ok(match domain {
        Domain::Weather => ParsedLog::Weather(parse_weather_log(raw)?),
        Domain::Steps => ParsedLog::Steps(parse_steps_csv(raw)),
        Domain::Bedtime => ParsedLog::Bedtime(correlate_nights(&parse_bedtime_csv(raw)?)),
        Domain::SpotifyYear => ParsedLog::SpotifyYear(parse_spotify_year_log(raw)),
        Domain::SpotifyGenres => ParsedLog::SpotifyGenres(parse_genre_dump(raw)?),
        Domain::Snapshot => ParsedLog::Snapshot(parse_snapshot(raw)?),
    })
}

/// Log a skipped row and move on
pub(crate) fn skip_row(err: ParseError) {
    tracing::warn!(error = %err, "skipping row");
}
