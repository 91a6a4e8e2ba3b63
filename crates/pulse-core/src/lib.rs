//! Core data types, bucketing, rollups and series assembly for the
//! personal-metrics dashboard
//!
//! Everything here is a pure function of its inputs and an explicit
//! reference time; fetching and parsing live in `pulse-ingest`.

pub mod bucketing;
pub mod charts;
pub mod pipeline;
pub mod rollups;
pub mod series;
pub mod time;
pub mod types;
pub mod units;

pub use bucketing::*;
pub use charts::*;
pub use pipeline::*;
pub use rollups::*;
pub use series::*;
pub use time::*;
pub use types::*;
pub use units::*;
