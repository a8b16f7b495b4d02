//! Sample results and the temporal profile points built from them.

use serde::Serialize;

use super::Scene;

/// Pixel values read for one scene at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    /// Joins back to [`Scene::object_id`].
    pub object_id: i64,

    /// One entry per band; `None` where the service had no number.
    pub values: Vec<Option<f64>>,
}

/// A scene joined with the values sampled from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalProfilePoint {
    #[serde(flatten)]
    pub scene: Scene,
    pub values: Vec<Option<f64>>,
}
