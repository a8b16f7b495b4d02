//! Core data model for pixel-trend.
//!
//! Scenes come out of the catalog, sample results come out of the
//! sampling service, and temporal profile points are the join of the two.

mod profile;
mod query;
mod scene;

use serde::{Deserialize, Serialize};

pub use profile::{SampleResult, TemporalProfilePoint};
pub use query::{TrendAxis, TrendQuery};
pub use scene::{DEFAULT_CLOUDY_THRESHOLD, Scene};

#[cfg(test)]
pub(crate) use scene::scene_on;

/// A query point in WGS84 longitude (`x`) and latitude (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
