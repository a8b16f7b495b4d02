//! Landsat Collection 2 Level-2 surface reflectance.
//!
//! Band order: coastal, blue, green, red, NIR, SWIR1, SWIR2, then the
//! QA_PIXEL band last. Samples whose QA band flags contamination are dropped.

use serde_json::{Value, json};

use super::{SourceProfile, selection_for, window_for};
use crate::catalog::{FieldNames, SceneFilter};
use crate::model::{TemporalProfilePoint, TrendQuery};
use crate::quality;
use crate::select::Selection;

pub const SERVICE_URL: &str =
    "https://landsat.imagery1.arcgis.com/arcgis/rest/services/LandsatC2L2/ImageServer";

/// Scenes cloudier than this never leave the catalog.
pub const DEFAULT_CLOUD_COVER_MAX: f64 = 0.5;

pub const FIELDS: FieldNames = FieldNames {
    object_id: "objectid",
    acquisition_date: "acquisitiondate",
    name: "name",
    cloud_cover: Some("cloudcover"),
    category: Some("category"),
    mission: Some("spacecraftid"),
};

/// Mosaic rule for `identify` without a scene: the service's "best" scene first.
pub fn default_mosaic_rule() -> Value {
    json!({
        "ascending": true,
        "mosaicMethod": "esriMosaicAttribute",
        "mosaicOperation": "MT_FIRST",
        "sortField": "best",
        "sortValue": "0",
    })
}

/// Catalog value for a Landsat mission number.
fn mission_value(mission: u8) -> String {
    format!("LANDSAT_{mission}")
}

/// Landsat as an imagery source profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Landsat {
    cloud_cover_max: f64,
    min_year_spacing: Option<i16>,
}

impl Default for Landsat {
    fn default() -> Self {
        Self {
            cloud_cover_max: DEFAULT_CLOUD_COVER_MAX,
            min_year_spacing: None,
        }
    }
}

impl Landsat {
    #[must_use]
    pub fn with_cloud_cover_max(mut self, max: f64) -> Self {
        self.cloud_cover_max = max;
        self
    }

    #[must_use]
    pub fn with_min_year_spacing(mut self, spacing: Option<i16>) -> Self {
        self.min_year_spacing = spacing;
        self
    }
}

impl SourceProfile for Landsat {
    fn name(&self) -> &'static str {
        "landsat"
    }

    fn filter(&self, query: &TrendQuery) -> SceneFilter {
        SceneFilter {
            location: query.location,
            window: window_for(query.axis),
            cloud_cover_max: Some(self.cloud_cover_max),
            missions_to_exclude: query
                .missions_to_exclude
                .iter()
                .copied()
                .map(mission_value)
                .collect(),
            extra_clauses: Vec::new(),
        }
    }

    fn selection(&self, query: &TrendQuery) -> Selection {
        selection_for(query.axis, self.min_year_spacing)
    }

    fn is_usable(&self, point: &TemporalProfilePoint) -> bool {
        quality::is_clear_pixel(&point.values)
    }
}
