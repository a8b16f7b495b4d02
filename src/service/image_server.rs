//! HTTP client for an ArcGIS-style image server.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::wire::{self, IdentifyResponse, QueryResponse, Sample, SamplesResponse};
use crate::band_values;
use crate::catalog::{self, DEFAULT_PAGE_SIZE, FieldNames, SceneCatalog, SceneFilter};
use crate::error::ServiceError;
use crate::model::{DEFAULT_CLOUDY_THRESHOLD, Location, SampleResult, Scene};
use crate::sampler::PixelSampler;

/// One image service endpoint, acting as both catalog and sampler.
#[derive(Debug, Clone)]
pub struct ImageServer {
    client: reqwest::Client,
    url: String,
    fields: FieldNames,

    /// Used by `identify` when no scene is named.
    default_mosaic_rule: Value,

    page_size: u32,
    cloudy_threshold: f64,
}

impl ImageServer {
    /// Create a client for the service at `url`.
    ///
    /// `default_mosaic_rule` picks a scene when `identify` isn't told which.
    pub fn new(
        url: impl Into<String>,
        fields: FieldNames,
        default_mosaic_rule: Value,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            fields,
            default_mosaic_rule,
            page_size: DEFAULT_PAGE_SIZE,
            cloudy_threshold: DEFAULT_CLOUDY_THRESHOLD,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_cloudy_threshold(mut self, threshold: f64) -> Self {
        self.cloudy_threshold = threshold;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Issue a GET against `operation` and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{operation}", self.url);
        debug!(%url, "request");

        let body = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        wire::decode(&body).inspect_err(|e| {
            if let ServiceError::Remote { .. } = e {
                warn!(%url, error = %e, "service reported an error");
            }
        })
    }

    /// Mosaic rule that pins sampling to exactly these rasters.
    fn lock_raster_rule(&self, object_ids: &[i64]) -> Value {
        let ids: Vec<String> = object_ids.iter().map(i64::to_string).collect();
        json!({
            "mosaicMethod": "esriMosaicLockRaster",
            "ascending": false,
            "lockRasterIds": object_ids,
            "where": format!("{} in ({})", self.fields.object_id, ids.join(",")),
        })
    }
}

fn point_geometry(location: Location) -> String {
    json!({
        "spatialReference": { "wkid": 4326 },
        "x": location.x,
        "y": location.y,
    })
    .to_string()
}

#[async_trait]
impl SceneCatalog for ImageServer {
    #[instrument(skip(self, filter))]
    async fn find_scenes(&self, filter: &SceneFilter) -> Result<Vec<Scene>, ServiceError> {
        let params = [
            ("f", "json".to_string()),
            ("spatialRel", "esriSpatialRelIntersects".to_string()),
            ("geometryType", "esriGeometryPoint".to_string()),
            ("geometry", point_geometry(filter.location)),
            ("outFields", self.fields.out_fields()),
            ("orderByFields", self.fields.acquisition_date.to_string()),
            ("resultOffset", "0".to_string()),
            ("resultRecordCount", self.page_size.to_string()),
            ("returnGeometry", "false".to_string()),
            ("where", catalog::where_clause(filter, &self.fields)),
        ];

        let response: QueryResponse = self.get("query", &params).await?;
        let records = response.into_records();

        if records.len() >= self.page_size as usize {
            warn!(
                page_size = self.page_size,
                "catalog page is full; later scenes were not returned"
            );
        }

        Ok(catalog::scenes_from_records(
            &records,
            &self.fields,
            self.cloudy_threshold,
        ))
    }
}

#[async_trait]
impl PixelSampler for ImageServer {
    #[instrument(skip(self, object_ids), fields(count = object_ids.len()))]
    async fn sample(
        &self,
        location: Location,
        object_ids: &[i64],
    ) -> Result<Vec<SampleResult>, ServiceError> {
        let params = [
            ("f", "json".to_string()),
            ("geometry", point_geometry(location)),
            ("geometryType", "esriGeometryPoint".to_string()),
            (
                "mosaicRule",
                self.lock_raster_rule(object_ids).to_string(),
            ),
            ("returnFirstValueOnly", "false".to_string()),
            ("returnGeometry", "false".to_string()),
        ];

        let response: SamplesResponse = self.get("getSamples", &params).await?;
        Ok(response
            .samples
            .into_iter()
            .map(Sample::into_result)
            .collect())
    }

    #[instrument(skip(self))]
    async fn identify(
        &self,
        location: Location,
        object_id: Option<i64>,
    ) -> Result<Vec<Option<f64>>, ServiceError> {
        let mosaic_rule = match object_id {
            Some(id) => self.lock_raster_rule(&[id]),
            None => self.default_mosaic_rule.clone(),
        };

        let params = [
            ("f", "json".to_string()),
            ("geometry", point_geometry(location)),
            ("geometryType", "esriGeometryPoint".to_string()),
            ("mosaicRule", mosaic_rule.to_string()),
            ("maxItemCount", "1".to_string()),
            ("returnGeometry", "false".to_string()),
            ("returnCatalogItems", "false".to_string()),
        ];

        let response: IdentifyResponse = self.get("identify", &params).await?;
        Ok(band_values::parse(&response.raw_values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::source::landsat;

    fn server() -> ImageServer {
        ImageServer::new(
            "https://example.test/ImageServer/",
            landsat::FIELDS,
            landsat::default_mosaic_rule(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(server().url(), "https://example.test/ImageServer");
    }

    #[test]
    fn lock_raster_rule_names_every_id() {
        let rule = server().lock_raster_rule(&[3, 5, 8]);

        assert_eq!(rule["mosaicMethod"], "esriMosaicLockRaster");
        assert_eq!(rule["lockRasterIds"], json!([3, 5, 8]));
        assert_eq!(rule["where"], "objectid in (3,5,8)");
    }

    #[test]
    fn point_geometry_is_wgs84() {
        let geometry: Value =
            serde_json::from_str(&point_geometry(Location::new(-105.0, 40.0))).unwrap();

        assert_eq!(geometry["spatialReference"]["wkid"], 4326);
        assert_eq!(geometry["x"], -105.0);
        assert_eq!(geometry["y"], 40.0);
    }
}
