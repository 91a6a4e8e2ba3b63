//! Step-count CSV parser

use pulse_core::{parse_date, StepRecord};

use crate::{skip_row, ParseError};

struct StepColumns {
    date: usize,
    steps: usize,
}

impl StepColumns {
    /// Columns named in a header line, if the line is one
    fn from_header(line: &str) -> Option<Self> {
        let headers: Vec<String> = line
            .split(',')
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        let find = |name: &str| headers.iter().position(|h| h == name);
        Some(Self {
            date: find("date")?,
            steps: find("steps")?,
        })
    }

    fn positional() -> Self {
        Self { date: 0, steps: 1 }
    }

    fn width(&self) -> usize {
        self.date.max(self.steps) + 1
    }
}

/// Parse `date,steps` rows.
///
/// A leading header naming `date` and `steps` selects the columns;
/// otherwise rows are read positionally. Bad rows are skipped.
pub fn parse_steps_csv(raw: &str) -> Vec<StepRecord> {
    let mut lines = raw.lines().enumerate().peekable();

    let header = lines
        .peek()
        .and_then(|(_, first)| StepColumns::from_header(first));
    let columns = match header {
        Some(cols) => {
            lines.next();
            cols
        }
        None => StepColumns::positional(),
    };

    lines
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match parse_row(line, &columns) {
            Ok(record) => Some(record),
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

fn parse_row(line: &str, columns: &StepColumns) -> Result<StepRecord, String> {
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
    let steps = fields[columns.steps]
        .parse::<u32>()
        .map_err(|_| format!("bad step count {:?}", fields[columns.steps]))?;

    Ok(StepRecord { date, steps })
}
