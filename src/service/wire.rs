//! JSON shapes returned by the image server, and their decoders.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::band_values::{self, NO_DATA, RawBandValues};
use crate::error::ServiceError;
use crate::model::SampleResult;

/// Error object the server embeds in an otherwise successful response.
#[derive(Deserialize)]
struct RemoteError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

/// Decode a response body, surfacing an embedded `error` object as
/// [`ServiceError::Remote`].
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    let mut value: Value = serde_json::from_str(body)?;

    if let Some(error) = value.get_mut("error") {
        let error: RemoteError = serde_json::from_value(error.take())?;
        return Err(ServiceError::Remote {
            code: error.code,
            message: error.message,
            details: error.details,
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// Response from `query`.
#[derive(Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Deserialize)]
pub struct Feature {
    pub attributes: Map<String, Value>,
}

impl QueryResponse {
    pub fn into_records(self) -> Vec<Map<String, Value>> {
        self.features.into_iter().map(|f| f.attributes).collect()
    }
}

/// Response from `getSamples`.
#[derive(Deserialize)]
pub struct SamplesResponse {
    #[serde(default)]
    pub samples: Vec<Sample>,
}

/// One sample: the pixel values of one raster at the query point.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub raster_id: i64,

    /// Space-delimited band values, or the no-data sentinel.
    pub value: Option<String>,
}

impl Sample {
    fn raw_values(&self) -> RawBandValues {
        match self.value.as_deref() {
            Some(v) if v != NO_DATA => RawBandValues::tokens(v),
            _ => RawBandValues::Empty,
        }
    }

    pub fn into_result(self) -> SampleResult {
        SampleResult {
            object_id: self.raster_id,
            values: band_values::parse(&self.raw_values()),
        }
    }
}

/// Response from `identify`.
#[derive(Deserialize)]
pub struct IdentifyResponse {
    /// Comma-and-space delimited band values, or the no-data sentinel.
    pub value: Option<String>,
    pub properties: Option<IdentifyProperties>,
}

#[derive(Deserialize)]
pub struct IdentifyProperties {
    #[serde(rename = "Values", default)]
    pub values: Vec<String>,
}

impl IdentifyResponse {
    pub fn raw_values(&self) -> RawBandValues {
        let fallback = self
            .properties
            .as_ref()
            .and_then(|p| p.values.first())
            .map(String::as_str);
        RawBandValues::from_identify(self.value.as_deref(), fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_yields_attribute_records() {
        let body = r#"{
            "objectIdFieldName": "objectid",
            "features": [
                { "attributes": { "objectid": 1, "acquisitiondate": 1559433600000, "cloudcover": 0.4 } },
                { "attributes": { "objectid": 2, "acquisitiondate": 1561000000000, "cloudcover": 0.1 } }
            ]
        }"#;

        let records = decode::<QueryResponse>(body).unwrap().into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["objectid"], 2);
    }

    #[test]
    fn missing_features_is_empty() {
        let records = decode::<QueryResponse>("{}").unwrap().into_records();
        assert!(records.is_empty());
    }

    #[test]
    fn embedded_error_becomes_remote() {
        let body = r#"{ "error": { "code": 400, "message": "Invalid query", "details": ["bad where"] } }"#;

        match decode::<QueryResponse>(body) {
            Err(ServiceError::Remote {
                code,
                message,
                details,
            }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "Invalid query");
                assert_eq!(details, ["bad where"]);
            }
            other => panic!("expected remote error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn malformed_body_is_json_error() {
        assert!(matches!(
            decode::<QueryResponse>("<html>"),
            Err(ServiceError::Json(_))
        ));
    }

    #[test]
    fn samples_decode_into_results() {
        let body = r#"{
            "samples": [
                { "locationId": 0, "rasterId": 7, "value": "120 45 -999 21824" },
                { "locationId": 0, "rasterId": 8, "value": "NoData" }
            ]
        }"#;

        let results: Vec<SampleResult> = decode::<SamplesResponse>(body)
            .unwrap()
            .samples
            .into_iter()
            .map(Sample::into_result)
            .collect();

        assert_eq!(results[0].object_id, 7);
        assert_eq!(
            results[0].values,
            [Some(120.0), Some(45.0), Some(-999.0), Some(21824.0)]
        );
        assert_eq!(results[1].object_id, 8);
        assert!(results[1].values.is_empty());
    }

    #[test]
    fn identify_prefers_value_then_properties() {
        let with_value: IdentifyResponse =
            decode(r#"{ "value": "120, 45, -999", "name": "Pixel" }"#).unwrap();
        assert_eq!(
            band_values::parse(&with_value.raw_values()),
            [Some(120.0), Some(45.0), Some(-999.0)]
        );

        let fallback: IdentifyResponse =
            decode(r#"{ "value": "NoData", "properties": { "Values": ["120 xx 45"] } }"#).unwrap();
        assert_eq!(
            band_values::parse(&fallback.raw_values()),
            [Some(120.0), None, Some(45.0)]
        );
    }
}
