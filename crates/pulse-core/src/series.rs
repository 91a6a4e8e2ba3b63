//! Plot-ready series assembly

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("series {name:?} has {found} points, expected {expected}")]
    Misalignment {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// One y series aligned to the chart's x labels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    pub name: String,
    /// `None` is a gap (missing or non-finite value)
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<Vec<String>>,
}

/// Per-point metadata shared by all traces
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PointOverlay {
    pub is_weekend: bool,
}

/// The data contract handed to the rendering collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartSeries {
    pub x: Vec<String>,
    pub traces: Vec<Trace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<PointOverlay>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Builds a [`ChartSeries`], rejecting anything not aligned to `x`
#[derive(Debug)]
pub struct SeriesBuilder {
    x: Vec<String>,
    traces: Vec<Trace>,
    overlays: Vec<PointOverlay>,
}

impl SeriesBuilder {
    pub fn new(x: Vec<String>) -> Self {
        Self {
            x,
            traces: Vec::new(),
            overlays: Vec::new(),
        }
    }

    fn check(&self, name: &str, found: usize) -> Result<(), SeriesError> {
        if found == self.x.len() {
            Ok(())
        } else {
            Err(SeriesError::Misalignment {
                name: name.to_string(),
                expected: self.x.len(),
                found,
            })
        }
    }

    pub fn trace(self, name: &str, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        self.push(name, values, None)
    }

    pub fn trace_with_hover(
        self,
        name: &str,
        values: Vec<Option<f64>>,
        hover: Vec<String>,
    ) -> Result<Self, SeriesError> {
        self.check(&format!("{name} hover"), hover.len())?;
        self.push(name, values, Some(hover))
    }

    fn push(
        mut self,
        name: &str,
        values: Vec<Option<f64>>,
        hover: Option<Vec<String>>,
    ) -> Result<Self, SeriesError> {
        self.check(name, values.len())?;
        let y = values
            .into_iter()
            .map(|v| v.filter(|v| v.is_finite()))
            .collect();
        self.traces.push(Trace {
            name: name.to_string(),
            y,
            hover,
        });
        Ok(self)
    }

    /// Weekend shading, one flag per x point
    pub fn weekend_overlay(mut self, dates: &[NaiveDate]) -> Result<Self, SeriesError> {
        self.check("weekend overlay", dates.len())?;
        self.overlays = dates
            .iter()
            .map(|&d| PointOverlay {
                is_weekend: is_weekend(d),
            })
            .collect();
        Ok(self)
    }

    pub fn build(self) -> ChartSeries {
        ChartSeries {
            x: self.x,
            traces: self.traces,
            overlays: self.overlays,
        }
    }
}
