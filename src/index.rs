//! Band indices: single values derived from a band vector.
//!
//! Landsat band order is coastal, blue, green, red, NIR, SWIR1, SWIR2 with
//! the QA band last. Sentinel-1 is VV, VH in power scale.

use serde::Serialize;

use crate::model::TemporalProfilePoint;

const GREEN: usize = 2;
const RED: usize = 3;
const NIR: usize = 4;
const SWIR1: usize = 5;

const VV: usize = 0;
const VH: usize = 1;

/// Normalized-difference indices over Landsat surface reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// NDVI: (NIR - Red) / (NIR + Red).
    Vegetation,

    /// MNDWI: (Green - SWIR1) / (Green + SWIR1).
    Water,

    /// NDMI: (NIR - SWIR1) / (NIR + SWIR1).
    Moisture,
}

impl SpectralIndex {
    pub fn compute(self, values: &[Option<f64>]) -> Option<f64> {
        let (a, b) = match self {
            Self::Vegetation => (NIR, RED),
            Self::Water => (GREEN, SWIR1),
            Self::Moisture => (NIR, SWIR1),
        };
        normalized_difference(band(values, a)?, band(values, b)?)
    }
}

/// Indices over Sentinel-1 backscatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarIndex {
    /// Sentinel-1 water index, on dB-converted VV and VH.
    Water,

    /// 0.01 / (0.01 + 2 VV), on power-scale VV.
    WaterAnomaly,
}

impl RadarIndex {
    pub fn compute(self, values: &[Option<f64>]) -> Option<f64> {
        let vv = band(values, VV)?;
        match self {
            Self::Water => {
                let vv = decibels(vv)?;
                let vh = decibels(band(values, VH)?)?;
                finite(
                    0.1747 * vv + 0.0082 * vh * vv + 0.0023 * vv.powi(2) - 0.0015 * vh.powi(2)
                        + 0.1904,
                )
            }
            Self::WaterAnomaly => {
                let denominator = 0.01 + 2.0 * vv;
                if denominator == 0.0 {
                    return None;
                }
                finite(0.01 / denominator)
            }
        }
    }
}

/// One index value on a trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendValue {
    pub object_id: i64,
    pub acquisition_date: String,
    pub value: Option<f64>,
}

/// Reduce a temporal profile to one index value per point.
pub fn trend(
    points: &[TemporalProfilePoint],
    index: impl Fn(&[Option<f64>]) -> Option<f64>,
) -> Vec<TrendValue> {
    points
        .iter()
        .map(|p| TrendValue {
            object_id: p.scene.object_id(),
            acquisition_date: p.scene.formatted_acquisition_date().to_string(),
            value: index(&p.values),
        })
        .collect()
}

fn band(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn normalized_difference(a: f64, b: f64) -> Option<f64> {
    let sum = a + b;
    if sum == 0.0 {
        return None;
    }
    finite((a - b) / sum)
}

fn decibels(power: f64) -> Option<f64> {
    (power > 0.0).then(|| 10.0 * power.log10())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
