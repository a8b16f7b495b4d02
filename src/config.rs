//! pixel-trend configuration.
//!
//! Loaded from `~/.pixel-trend/config.toml`, or from the path in
//! `PIXEL_TREND_CONFIG`. A missing file means every default applies.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::model::DEFAULT_CLOUDY_THRESHOLD;
use crate::sampler::DEFAULT_BATCH_SIZE;
use crate::source::{landsat, sentinel1};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "PIXEL_TREND_CONFIG";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// pixel-trend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,

    pub sampling: Sampling,
    pub landsat: LandsatConfig,
    pub sentinel1: Sentinel1Config,
}

/// Knobs shared by every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Sampling {
    /// Scene ids per sampling request.
    pub batch_size: usize,

    /// Catalog records per query.
    pub page_size: u32,

    /// Cloud cover above which a scene is flagged cloudy.
    pub cloudy_threshold: f64,

    /// Minimum years between consecutive picks on a year-to-year trend.
    pub min_year_spacing: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LandsatConfig {
    pub service_url: String,
    pub cloud_cover_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Sentinel1Config {
    pub service_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sampling: Sampling::default(),
            landsat: LandsatConfig::default(),
            sentinel1: Sentinel1Config::default(),
        }
    }
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            cloudy_threshold: DEFAULT_CLOUDY_THRESHOLD,
            min_year_spacing: None,
        }
    }
}

impl Default for LandsatConfig {
    fn default() -> Self {
        Self {
            service_url: landsat::SERVICE_URL.to_string(),
            cloud_cover_max: landsat::DEFAULT_CLOUD_COVER_MAX,
        }
    }
}

impl Default for Sentinel1Config {
    fn default() -> Self {
        Self {
            service_url: sentinel1::SERVICE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from `explicit`, else `PIXEL_TREND_CONFIG`, else the
    /// default path.
    ///
    /// A missing default file yields defaults. A missing file that was
    /// asked for by name is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        match named {
            Some(path) => Self::load_from(&path),
            None => match Self::path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load and validate the config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        config
            .validate()
            .map_err(|e| format!("{e} in {}", path.display()))?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sampling.batch_size == 0 {
            return Err("sampling.batch-size must be at least 1".to_string());
        }
        if self.sampling.page_size == 0 {
            return Err("sampling.page-size must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.sampling.cloudy_threshold) {
            return Err("sampling.cloudy-threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.landsat.cloud_cover_max) {
            return Err("landsat.cloud-cover-max must be between 0 and 1".to_string());
        }
        if let Some(spacing) = self.sampling.min_year_spacing
            && spacing < 1
        {
            return Err("sampling.min-year-spacing must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The default config file path: `~/.pixel-trend/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pixel-trend").join("config.toml"))
    }
}
