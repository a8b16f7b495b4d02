//! Scene catalog: filtered scene discovery.
//!
//! A [`SceneFilter`] describes what to look for independent of any wire
//! format. [`where_clause`] renders it against a source's [`FieldNames`],
//! and [`scenes_from_records`] normalizes the attribute records that come
//! back into [`Scene`]s.

use async_trait::async_trait;
use jiff::Timestamp;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ServiceError;
use crate::model::{Location, Scene};

/// Records past this count are cut off by the service.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// The temporal part of a catalog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    /// The whole of one calendar year.
    Year(i16),

    /// One calendar month, in every year on record.
    Month(i8),

    /// An explicit inclusive range.
    Range { start: Timestamp, end: Timestamp },
}

/// Everything a catalog query filters on.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFilter {
    pub location: Location,
    pub window: DateWindow,

    /// Upper bound on cloud cover, or `None` for sources without one.
    pub cloud_cover_max: Option<f64>,

    /// Attribute values to exclude from `FieldNames::mission`.
    pub missions_to_exclude: Vec<String>,

    /// Additional raw predicates, ANDed with the rest.
    pub extra_clauses: Vec<String>,
}

/// Attribute names for one image service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub object_id: &'static str,
    pub acquisition_date: &'static str,
    pub name: &'static str,
    pub cloud_cover: Option<&'static str>,
    pub category: Option<&'static str>,
    pub mission: Option<&'static str>,
}

impl FieldNames {
    /// Fields to request back from the catalog.
    pub fn out_fields(&self) -> String {
        [
            Some(self.object_id),
            Some(self.acquisition_date),
            Some(self.name),
            self.cloud_cover,
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Discovers scenes matching a filter.
///
/// Implementations return scenes in ascending acquisition order, as the
/// service sent them. Zero matches is an empty vector, not an error.
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    async fn find_scenes(&self, filter: &SceneFilter) -> Result<Vec<Scene>, ServiceError>;
}

/// Render a filter as a SQL-style where clause.
pub fn where_clause(filter: &SceneFilter, fields: &FieldNames) -> String {
    let mut clauses = Vec::new();

    if let Some(category) = fields.category {
        clauses.push(format!("({category} = 1)"));
    }

    if let (Some(field), Some(max)) = (fields.cloud_cover, filter.cloud_cover_max) {
        clauses.push(format!("({field} <= {max})"));
    }

    let date = fields.acquisition_date;
    match filter.window {
        DateWindow::Year(year) => clauses.push(format!(
            "({date} BETWEEN timestamp '{year}-01-01 00:00:00' AND timestamp '{year}-12-31 23:59:59')"
        )),
        DateWindow::Month(month) => {
            clauses.push(format!("(EXTRACT(MONTH FROM {date}) = {month})"));
        }
        DateWindow::Range { start, end } => clauses.push(format!(
            "({date} BETWEEN timestamp '{}' AND timestamp '{}')",
            start.strftime("%Y-%m-%d %H:%M:%S"),
            end.strftime("%Y-%m-%d %H:%M:%S"),
        )),
    }

    if let Some(mission) = fields.mission
        && !filter.missions_to_exclude.is_empty()
    {
        let values: Vec<String> = filter
            .missions_to_exclude
            .iter()
            .map(|m| format!("'{}'", m.replace('\'', "''")))
            .collect();
        clauses.push(format!("({mission} NOT IN ({}))", values.join(",")));
    }

    clauses.extend(filter.extra_clauses.iter().cloned());

    clauses.join(" AND ")
}

/// Normalize catalog attribute records into scenes.
///
/// Records missing an id or acquisition date are skipped with a warning.
/// A missing cloud cover reads as zero.
pub fn scenes_from_records(
    records: &[Map<String, Value>],
    fields: &FieldNames,
    cloudy_threshold: f64,
) -> Vec<Scene> {
    records
        .iter()
        .filter_map(|attrs| {
            let scene = scene_from_record(attrs, fields, cloudy_threshold);
            if scene.is_none() {
                warn!(?attrs, "skipping catalog record without id or date");
            }
            scene
        })
        .collect()
}

fn scene_from_record(
    attrs: &Map<String, Value>,
    fields: &FieldNames,
    cloudy_threshold: f64,
) -> Option<Scene> {
    let object_id = attrs.get(fields.object_id)?.as_i64()?;
    let millis = attrs.get(fields.acquisition_date)?.as_i64()?;
    let acquisition_date = Timestamp::from_millisecond(millis).ok()?;

    let name = attrs
        .get(fields.name)
        .and_then(Value::as_str)
        .unwrap_or_default();

    let cloud_cover = fields
        .cloud_cover
        .and_then(|f| attrs.get(f))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Some(Scene::new(
        object_id,
        name,
        acquisition_date,
        cloud_cover,
        cloudy_threshold,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use serde_json::json;

    use crate::model::DEFAULT_CLOUDY_THRESHOLD;

    /// Never answers.
    pub(crate) struct StalledCatalog;

    #[async_trait]
    impl SceneCatalog for StalledCatalog {
        async fn find_scenes(&self, _filter: &SceneFilter) -> Result<Vec<Scene>, ServiceError> {
            std::future::pending().await
        }
    }

    const FIELDS: FieldNames = FieldNames {
        object_id: "objectid",
        acquisition_date: "acquisitiondate",
        name: "name",
        cloud_cover: Some("cloudcover"),
        category: Some("category"),
        mission: Some("spacecraftid"),
    };

    fn filter(window: DateWindow) -> SceneFilter {
        SceneFilter {
            location: Location::new(-105.0, 40.0),
            window,
            cloud_cover_max: Some(0.5),
            missions_to_exclude: Vec::new(),
            extra_clauses: Vec::new(),
        }
    }

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn year_window_clause() {
        let clause = where_clause(&filter(DateWindow::Year(2020)), &FIELDS);
        assert_eq!(
            clause,
            "(category = 1) AND (cloudcover <= 0.5) AND \
             (acquisitiondate BETWEEN timestamp '2020-01-01 00:00:00' \
             AND timestamp '2020-12-31 23:59:59')"
        );
    }

    #[test]
    fn month_window_and_missions() {
        let mut f = filter(DateWindow::Month(6));
        f.missions_to_exclude = vec!["LANDSAT_7".into(), "LANDSAT_5".into()];

        let clause = where_clause(&f, &FIELDS);
        assert!(clause.contains("(EXTRACT(MONTH FROM acquisitiondate) = 6)"));
        assert!(clause.ends_with("(spacecraftid NOT IN ('LANDSAT_7','LANDSAT_5'))"));
    }

    #[test]
    fn range_window_clause() {
        let start: Timestamp = "2021-03-01T00:00:00Z".parse().unwrap();
        let end: Timestamp = "2021-03-31T23:59:59Z".parse().unwrap();
        let clause = where_clause(&filter(DateWindow::Range { start, end }), &FIELDS);
        assert!(clause.contains(
            "(acquisitiondate BETWEEN timestamp '2021-03-01 00:00:00' \
             AND timestamp '2021-03-31 23:59:59')"
        ));
    }

    #[test]
    fn sources_without_cloud_cover_skip_that_clause() {
        let fields = FieldNames {
            cloud_cover: None,
            category: None,
            mission: None,
            ..FIELDS
        };
        let mut f = filter(DateWindow::Year(2022));
        f.extra_clauses.push("(orbitdirection = 'Ascending')".into());

        let clause = where_clause(&f, &fields);
        assert!(!clause.contains("cloudcover"));
        assert!(!clause.contains("category"));
        assert!(clause.ends_with("AND (orbitdirection = 'Ascending')"));
    }

    #[test]
    fn out_fields_list_known_attributes() {
        assert_eq!(
            FIELDS.out_fields(),
            "objectid,acquisitiondate,name,cloudcover"
        );
    }

    #[test]
    fn records_normalize_into_scenes() {
        let records = vec![
            record(json!({
                "objectid": 11,
                "acquisitiondate": 1_559_433_600_000_i64,
                "name": "LC08_034032_20190602",
                "cloudcover": 0.4
            })),
            record(json!({ "objectid": 12, "name": "no date" })),
            record(json!({
                "objectid": 13,
                "acquisitiondate": 1_591_747_200_000_i64,
                "name": "S1A"
            })),
        ];

        let scenes = scenes_from_records(&records, &FIELDS, DEFAULT_CLOUDY_THRESHOLD);
        assert_eq!(scenes.len(), 2);

        assert_eq!(scenes[0].object_id(), 11);
        assert_eq!(scenes[0].formatted_acquisition_date(), "2019-06-02");
        assert!(scenes[0].is_cloudy());

        assert_eq!(scenes[1].object_id(), 13);
        assert!(scenes[1].cloud_cover().abs() < f64::EPSILON);
    }
}
