//! Error types for the dashboard

use brent_forecast::ForecastError;
use thiserror::Error;

/// Failures while building or rendering a dashboard view
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Loading, modelling or forecasting failed
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// A chart could not be drawn
    #[error("Chart error: {0}")]
    Chart(String),

    /// Error in the dashboard configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<toml::de::Error> for DashboardError {
    fn from(err: toml::de::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for DashboardError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DashboardError::Forecast(ForecastError::from(err))
    }
}
