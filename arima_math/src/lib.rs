//! # ARIMA Math
//!
//! Statistical building blocks for univariate ARIMA forecasting.
//! This crate provides differencing and integration helpers, a KPSS
//! stationarity test, conditional-sum-of-squares ARIMA estimation and a
//! stepwise automatic order search.

use thiserror::Error;

pub mod arima;
pub mod auto;
pub mod optimize;
pub mod stationarity;

pub use crate::arima::{fit_arima, fit_arima_conditional, ArimaOrder, FittedArima};
pub use crate::auto::{AutoArima, AutoArimaFit, CandidateFit, InformationCriterion};

/// Errors that can occur while estimating or evaluating a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model fit failed: {0}")]
    FitFailed(String),

    #[error("No candidate model could be fitted: {0}")]
    NoValidModel(String),
}

/// Result type for ARIMA math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Apply `order` rounds of first differencing
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of each differencing level `0..order`, used to integrate
/// forecasts back to the original scale.
pub fn integration_anchors(data: &[f64], order: usize) -> Vec<f64> {
    let mut anchors = Vec::with_capacity(order);
    let mut level = data.to_vec();
    for _ in 0..order {
        if let Some(last) = level.last() {
            anchors.push(*last);
        }
        level = difference(&level, 1);
    }
    anchors
}

/// Undo differencing of future values given the anchors from
/// [`integration_anchors`].
pub fn integrate(forecasts: &[f64], anchors: &[f64]) -> Vec<f64> {
    let mut result = forecasts.to_vec();
    for anchor in anchors.iter().rev() {
        let mut running = *anchor;
        for value in result.iter_mut() {
            running += *value;
            *value = running;
        }
    }
    result
}
