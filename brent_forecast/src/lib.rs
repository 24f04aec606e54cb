//! # Brent Forecast
//!
//! Loading, modelling and forecasting of the daily Brent crude (FOB) price.
//!
//! ## Features
//!
//! - Scraping of the published price table into a clean, date-indexed series
//! - Two interchangeable model providers: a stepwise auto-ARIMA fitted on
//!   demand, or a model loaded from a JSON artifact
//! - Day-ahead forecasts on consecutive calendar days after the last
//!   observation
//! - Process-wide memoization of the series and of fitted models
//!
//! ## Quick Start
//!
//! ```no_run
//! use brent_forecast::config::ForecastConfig;
//! use brent_forecast::data::SeriesLoader;
//! use brent_forecast::forecaster::forecast;
//! use brent_forecast::models::{cached_model, provider_from_config};
//!
//! let config = ForecastConfig::default();
//! let loader = SeriesLoader::from_config(&config.source)?;
//! let series = loader.load_cached()?;
//!
//! let provider = provider_from_config(&config.model);
//! let model = cached_model(provider.as_ref(), &series)?;
//!
//! let horizon = config.horizon.default_horizon()?;
//! let result = forecast(&model, &series, horizon)?;
//! println!("{}", result.to_dataframe()?);
//! # Ok::<(), brent_forecast::ForecastError>(())
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod forecaster;
pub mod html;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{ForecastConfig, HorizonBounds};
pub use crate::data::{ObservedSeries, SeriesLoader};
pub use crate::error::ForecastError;
pub use crate::forecaster::{forecast, ForecastResult, Horizon};
pub use crate::models::{ForecastModel, ModelProvider};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
