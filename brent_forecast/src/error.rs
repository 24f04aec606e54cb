//! Error types for the brent_forecast crate

use arima_math::MathError;
use chrono::NaiveDate;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the brent_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The remote resource was unreachable or had an unexpected structure
    #[error("Data source error: {0}")]
    DataSource(String),

    /// A scraped token could not be converted to its semantic type
    #[error("Parse error: {0}")]
    Parse(String),

    /// The persisted model file does not exist
    #[error("Model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The persisted model file is unreadable or incompatible
    #[error("Model artifact {} is corrupt: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// The persisted model was trained on a different series cutoff
    #[error("Model artifact trained through {trained_through} but series ends {series_end}")]
    StaleArtifact {
        trained_through: NaiveDate,
        series_end: NaiveDate,
    },

    /// Requested horizon outside the accepted range
    #[error("Invalid horizon {requested}: {reason}")]
    InvalidHorizon { requested: i64, reason: String },

    /// Error from model estimation or prediction
    #[error("Model error: {0}")]
    Model(#[from] MathError),

    /// Error in the configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Csv(err.to_string())
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::DataSource(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
