//! Sentinel-1 RTC synthetic aperture radar.
//!
//! Radar sees through cloud, so there's no cloud cover to filter or
//! tie-break on: every scene reports zero and the first scene of each
//! bucket is kept. Band order: VV, VH.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{SourceProfile, selection_for, window_for};
use crate::catalog::{FieldNames, SceneFilter};
use crate::model::TrendQuery;
use crate::select::Selection;

pub const SERVICE_URL: &str =
    "https://sentinel1.imagery1.arcgis.com/arcgis/rest/services/Sentinel1RTC/ImageServer";

pub const FIELDS: FieldNames = FieldNames {
    object_id: "objectid",
    acquisition_date: "acquisitiondate",
    name: "name",
    cloud_cover: None,
    category: None,
    mission: None,
};

const ORBIT_DIRECTION_FIELD: &str = "orbitdirection";

/// Mosaic rule for `identify` without a scene: most recent acquisition first.
pub fn default_mosaic_rule() -> Value {
    json!({
        "ascending": false,
        "mosaicMethod": "esriMosaicAttribute",
        "mosaicOperation": "MT_FIRST",
        "sortField": "acquisitiondate",
    })
}

/// Satellite pass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitDirection {
    Ascending,
    Descending,
}

impl OrbitDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }
}

/// Sentinel-1 as an imagery source profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentinel1 {
    orbit_direction: Option<OrbitDirection>,
}

impl Sentinel1 {
    /// Only use scenes from passes in this direction.
    #[must_use]
    pub fn with_orbit_direction(mut self, direction: Option<OrbitDirection>) -> Self {
        self.orbit_direction = direction;
        self
    }
}

impl SourceProfile for Sentinel1 {
    fn name(&self) -> &'static str {
        "sentinel1"
    }

    fn filter(&self, query: &TrendQuery) -> SceneFilter {
        let extra_clauses = self
            .orbit_direction
            .map(|d| format!("({ORBIT_DIRECTION_FIELD} = '{}')", d.as_str()))
            .into_iter()
            .collect();

        SceneFilter {
            location: query.location,
            window: window_for(query.axis),
            cloud_cover_max: None,
            missions_to_exclude: Vec::new(),
            extra_clauses,
        }
    }

    fn selection(&self, query: &TrendQuery) -> Selection {
        selection_for(query.axis, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::catalog::{DateWindow, where_clause};
    use crate::model::Location;

    #[test]
    fn orbit_direction_becomes_a_clause() {
        let profile = Sentinel1::default().with_orbit_direction(Some(OrbitDirection::Descending));
        let query =
            TrendQuery::month_to_month(Location::new(10.0, 50.0), 2022).excluding([7]);

        let filter = profile.filter(&query);
        assert_eq!(filter.window, DateWindow::Year(2022));
        assert_eq!(filter.cloud_cover_max, None);
        assert!(filter.missions_to_exclude.is_empty());

        let clause = where_clause(&filter, &FIELDS);
        assert!(clause.ends_with("AND (orbitdirection = 'Descending')"));
    }

    #[test]
    fn selection_never_spaces_years() {
        let query = TrendQuery::year_to_year(Location::new(10.0, 50.0), 3);
        assert_eq!(Sentinel1::default().selection(&query).min_year_spacing, None);
    }
}
