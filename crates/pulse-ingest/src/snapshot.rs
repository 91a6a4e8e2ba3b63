//! Current-conditions snapshot (`data.json`)

use pulse_core::CurrentConditions;

use crate::{ParseError, ParseResult};

pub fn parse_snapshot(raw: &str) -> ParseResult<CurrentConditions> {
    serde_json::from_str(raw).map_err(|e| ParseError::MalformedSnapshot(e.to_string()))
}
