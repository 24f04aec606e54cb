//! Deployment configuration
//!
//! Every value has a default so an empty TOML document is a valid
//! configuration.

use crate::error::{ForecastError, Result};
use arima_math::InformationCriterion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Ipeadata page for the daily Brent FOB series (EIA366_PBRENT366)
pub const DEFAULT_SOURCE_URL: &str =
    "http://www.ipeadata.gov.br/ExibeSerie.aspx?module=m&serid=1650971490&oper=view";

/// Position of the data table among all tables on the source page.
/// This is a layout convention of the provider and must be revisited if the
/// page structure changes.
pub const DEFAULT_TABLE_INDEX: usize = 2;

/// Default location of the persisted model
pub const DEFAULT_ARTIFACT_PATH: &str = "modelo_petroleo_brent_arima.json";

/// Top-level forecasting configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub horizon: HorizonBounds,
}

/// Where and how the series is fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Index of the series table among the tables of the page
    #[serde(default = "default_table_index")]
    pub table_index: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Which model provider is deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Fit a model on the loaded series at startup
    #[default]
    Train,
    /// Load a model fitted offline
    Artifact,
}

/// What to do when a loaded artifact was trained on a different cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessPolicy {
    /// Accept the artifact and log a warning
    #[default]
    Warn,
    /// Refuse to forecast with the artifact
    Reject,
}

/// Model provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub variant: ModelVariant,

    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    #[serde(default)]
    pub staleness: StalenessPolicy,

    #[serde(default)]
    pub criterion: InformationCriterion,

    #[serde(default = "default_max_p")]
    pub max_p: usize,

    #[serde(default = "default_max_q")]
    pub max_q: usize,

    #[serde(default = "default_max_d")]
    pub max_d: usize,

    /// Cap on `p + q`
    #[serde(default = "default_max_order")]
    pub max_order: usize,
}

/// Bounds of the horizon control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonBounds {
    #[serde(default = "default_horizon_min")]
    pub min: u32,

    #[serde(default = "default_horizon_max")]
    pub max: u32,

    #[serde(default = "default_horizon_default")]
    pub default: u32,

    /// Slider step; `None` allows every value in range
    #[serde(default)]
    pub step: Option<u32>,
}

// Default value functions
fn default_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}
fn default_table_index() -> usize {
    DEFAULT_TABLE_INDEX
}
fn default_user_agent() -> String {
    format!("brent_forecast/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_artifact_path() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_PATH)
}
fn default_max_p() -> usize {
    5
}
fn default_max_q() -> usize {
    5
}
fn default_max_d() -> usize {
    2
}
fn default_max_order() -> usize {
    5
}
fn default_horizon_min() -> u32 {
    7
}
fn default_horizon_max() -> u32 {
    180
}
fn default_horizon_default() -> u32 {
    60
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            table_index: default_table_index(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            artifact_path: default_artifact_path(),
            staleness: StalenessPolicy::default(),
            criterion: InformationCriterion::default(),
            max_p: default_max_p(),
            max_q: default_max_q(),
            max_d: default_max_d(),
            max_order: default_max_order(),
        }
    }
}

impl Default for HorizonBounds {
    fn default() -> Self {
        Self {
            min: default_horizon_min(),
            max: default_horizon_max(),
            default: default_horizon_default(),
            step: None,
        }
    }
}

impl ForecastConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ForecastConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let h = &self.horizon;
        if h.min == 0 || h.min > h.max {
            return Err(ForecastError::Config(format!(
                "horizon bounds must satisfy 0 < min <= max, got min = {}, max = {}",
                h.min, h.max
            )));
        }
        if h.default < h.min || h.default > h.max {
            return Err(ForecastError::Config(format!(
                "default horizon {} outside [{}, {}]",
                h.default, h.min, h.max
            )));
        }
        if h.step == Some(0) {
            return Err(ForecastError::Config(
                "horizon step must be positive".to_string(),
            ));
        }
        if self.source.url.trim().is_empty() {
            return Err(ForecastError::Config("source url is empty".to_string()));
        }
        Ok(())
    }
}
