//! Spotify average-year log and playlist genre dump

use pulse_core::{parse_timestamp, GenreCount, SpotifyPoint};
use serde_json::Value;
use tracing::debug;

use crate::{skip_row, ParseError, ParseResult};

/// Leading entries of the genre dump that are not genres
const GENRE_DUMP_HEADER_ENTRIES: usize = 2;

/// Parse `timestamp,...,value` lines.
///
/// Only the first and last fields are read. A value that is not a number
/// becomes NaN and later renders as a gap; a row whose timestamp cannot be
/// read is skipped.
pub fn parse_spotify_year_log(raw: &str) -> Vec<SpotifyPoint> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match parse_line(line) {
            Ok(point) => Some(point),
            Err(reason) => {
                skip_row(ParseError::MalformedRow {
                    line: idx + 1,
                    reason,
                });
                None
            }
        })
        .collect()
}

fn parse_line(line: &str) -> Result<SpotifyPoint, String> {
    let mut fields = line.split(',').map(str::trim);
    let first = fields.next().unwrap_or_default();
    let last = fields.last().unwrap_or(first);

    let date = parse_timestamp(first)
        .ok_or_else(|| format!("bad timestamp {first:?}"))?
        .date();
    let average_release_year = last.parse::<f64>().unwrap_or(f64::NAN);

    Ok(SpotifyPoint {
        date,
        average_release_year,
    })
}

/// Parse the single-quoted `[[genre, [songs...]], ...]` dump.
///
/// The first two entries and the last one are not genres and are dropped.
pub fn parse_genre_dump(raw: &str) -> ParseResult<Vec<GenreCount>> {
    let text = raw.replace('\'', "\"");
    let entries: Vec<Value> =
        serde_json::from_str(&text).map_err(|e| ParseError::MalformedGenreDump(e.to_string()))?;

    if entries.len() <= GENRE_DUMP_HEADER_ENTRIES {
        debug!(entries = entries.len(), "genre dump has no genre entries");
        return Ok(Vec::new());
    }

    let genres = entries[GENRE_DUMP_HEADER_ENTRIES..entries.len() - 1]
        .iter()
        .map(to_genre_count)
        .collect::<ParseResult<Vec<_>>>()?;
    debug!(genres = genres.len(), "parsed genre dump");
    Ok(genres)
}

fn to_genre_count(entry: &Value) -> ParseResult<GenreCount> {
    match entry.as_array().map(Vec::as_slice) {
        Some([Value::String(genre), Value::Array(songs), ..]) => Ok(GenreCount {
            genre: genre.clone(),
            track_count: songs.len(),
        }),
        _ => Err(ParseError::MalformedGenreDump(format!(
            "expected [genre, [songs]], found {entry}"
        ))),
    }
}
