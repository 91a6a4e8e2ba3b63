//! Bedtime log parser and night correlation

use std::collections::BTreeMap;

use pulse_core::{parse_date, BedtimeEvent, ClockTime, EventKind, NightRecord};

use crate::{skip_row, ParseError, ParseResult};

const DATE_COLUMN: &str = "date";
const KIND_COLUMN: &str = "bedtime";
const TIME_COLUMN: &str = "time";

struct BedtimeColumns {
    date: usize,
    kind: usize,
    time: usize,
}

impl BedtimeColumns {
    fn from_header(line: &str) -> ParseResult<Self> {
        let headers: Vec<&str> = line.split(',').map(str::trim).collect();
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or(ParseError::MalformedBedtimeHeader(name))
        };
        Ok(Self {
            date: find(DATE_COLUMN)?,
            kind: find(KIND_COLUMN)?,
            time: find(TIME_COLUMN)?,
        })
    }

    fn width(&self) -> usize {
        self.date.max(self.kind).max(self.time) + 1
    }
}

/// Parse the header-driven bedtime CSV into events, in file order
pub fn parse_bedtime_csv(raw: &str) -> ParseResult<Vec<BedtimeEvent>> {
    let mut lines = raw.lines().enumerate();
    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns = BedtimeColumns::from_header(header)?;

    Ok(lines
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match parse_row(line, &columns) {
            Ok(event) => Some(event),
            Err(reason) => {
                skip_row(ParseError::MalformedRow {
                    line: idx + 1,
                    reason,
                });
                None
            }
        })
        .collect())
}

fn parse_row(line: &str, columns: &BedtimeColumns) -> Result<BedtimeEvent, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < columns.width() {
        return Err(format!(
            "expected {} fields, found {}",
            columns.width(),
            fields.len()
        ));
    }

    let date = parse_date(fields[columns.date])
        .ok_or_else(|| format!("bad date {:?}", fields[columns.date]))?;
    let kind: EventKind = fields[columns.kind].parse()?;
    let time: ClockTime = fields[columns.time].parse().map_err(|e| format!("{e}"))?;

    Ok(BedtimeEvent { date, kind, time })
}

/// Fold events into one record per date, sorted by date.
///
/// A later event of the same kind on the same date replaces the earlier one.
pub fn correlate_nights(events: &[BedtimeEvent]) -> Vec<NightRecord> {
    let mut nights: BTreeMap<_, NightRecord> = BTreeMap::new();
    for event in events {
        let night = nights.entry(event.date).or_insert(NightRecord {
            date: event.date,
            bedtime: None,
            wakeup: None,
        });
        match event.kind {
            EventKind::Bedtime => night.bedtime = Some(event.time),
            EventKind::Wakeup => night.wakeup = Some(event.time),
        }
    }
    nights.into_values().collect()
}
