//! Dashboard configuration
//!
//! The forecasting sections (`[source]`, `[model]`, `[horizon]`) are shared
//! with the library; `[output]` only concerns rendering.

use crate::error::{DashboardError, Result};
use brent_forecast::ForecastConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "brent_dashboard.toml";

/// Full dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where and how the views are rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Number of trailing observations in the zoomed chart
    #[serde(default = "default_zoom_window")]
    pub zoom_window: usize,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_zoom_window() -> usize {
    365
}
fn default_chart_width() -> u32 {
    1200
}
fn default_chart_height() -> u32 {
    400
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            zoom_window: default_zoom_window(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration
    ///
    /// An explicit path must exist. Without one, `brent_dashboard.toml` in the
    /// working directory is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| {
            DashboardError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Read configuration");
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.forecast.validate()?;
        if self.output.zoom_window == 0 {
            return Err(DashboardError::Config(
                "zoom_window must be positive".to_string(),
            ));
        }
        if self.output.chart_width == 0 || self.output.chart_height == 0 {
            return Err(DashboardError::Config(
                "chart dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
