//! Scene: one satellite acquisition.

use jiff::{Timestamp, tz::TimeZone};
use serde::Serialize;

/// Any scene with cloud cover above this fraction is considered cloudy.
pub const DEFAULT_CLOUDY_THRESHOLD: f64 = 0.25;

/// One satellite acquisition with its catalog metadata.
///
/// The year, month, formatted date, and cloudy flag are derived once in
/// [`Scene::new`] and can't be changed independently of the acquisition date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    object_id: i64,
    name: String,

    /// Serialized as epoch milliseconds.
    #[serde(with = "jiff::fmt::serde::timestamp::millisecond::required")]
    acquisition_date: Timestamp,

    acquisition_year: i16,
    acquisition_month: i8,

    /// `YYYY-MM-DD`, in UTC.
    formatted_acquisition_date: String,

    /// Fraction in `[0, 1]`.
    cloud_cover: f64,
    is_cloudy: bool,
}

impl Scene {
    pub fn new(
        object_id: i64,
        name: impl Into<String>,
        acquisition_date: Timestamp,
        cloud_cover: f64,
        cloudy_threshold: f64,
    ) -> Self {
        let date = acquisition_date.to_zoned(TimeZone::UTC).date();

        Self {
            object_id,
            name: name.into(),
            acquisition_date,
            acquisition_year: date.year(),
            acquisition_month: date.month(),
            formatted_acquisition_date: date.to_string(),
            cloud_cover,
            is_cloudy: cloud_cover > cloudy_threshold,
        }
    }

    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn acquisition_date(&self) -> Timestamp {
        self.acquisition_date
    }

    pub fn acquisition_year(&self) -> i16 {
        self.acquisition_year
    }

    /// Calendar month, 1 through 12.
    pub fn acquisition_month(&self) -> i8 {
        self.acquisition_month
    }

    pub fn formatted_acquisition_date(&self) -> &str {
        &self.formatted_acquisition_date
    }

    pub fn cloud_cover(&self) -> f64 {
        self.cloud_cover
    }

    pub fn is_cloudy(&self) -> bool {
        self.is_cloudy
    }
}

/// Build a scene acquired at midnight UTC on `date` (`YYYY-MM-DD`).
#[cfg(test)]
pub(crate) fn scene_on(object_id: i64, date: &str, cloud_cover: f64) -> Scene {
    let date: jiff::civil::Date = date.parse().unwrap();
    let ts = date.to_zoned(TimeZone::UTC).unwrap().timestamp();
    Scene::new(
        object_id,
        format!("scene-{object_id}"),
        ts,
        cloud_cover,
        DEFAULT_CLOUDY_THRESHOLD,
    )
}
