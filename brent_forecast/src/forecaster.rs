//! Day-ahead forecasting
//!
//! Pairs model predictions with the calendar days following the last
//! observation.

use crate::config::HorizonBounds;
use crate::data::{ObservedSeries, DATE_COLUMN};
use crate::error::{ForecastError, Result};
use crate::models::ForecastModel;
use crate::utils::{future_dates, round2};
use arima_math::MathError;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Name of the predicted price column
pub const FORECAST_COLUMN: &str = "Previsao";

/// Largest horizon accepted by default
pub const DEFAULT_MAX_HORIZON: u32 = 180;

/// A validated number of days to forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Horizon(u32);

impl Horizon {
    /// Accept `days` in `1..=max`
    pub fn new(days: i64, max: u32) -> Result<Self> {
        if days <= 0 {
            return Err(ForecastError::InvalidHorizon {
                requested: days,
                reason: "horizon must be at least one day".to_string(),
            });
        }
        if days > i64::from(max) {
            return Err(ForecastError::InvalidHorizon {
                requested: days,
                reason: format!("horizon exceeds the maximum of {} days", max),
            });
        }
        Ok(Horizon(days as u32))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl HorizonBounds {
    /// Validate a value coming from the horizon control
    ///
    /// On top of `1..=max` the control requires `min` and, when a step is
    /// set, a value on the grid `min + k * step`. The configured default is
    /// always accepted.
    pub fn control_value(&self, days: i64) -> Result<Horizon> {
        if days < i64::from(self.min) && days > 0 {
            return Err(ForecastError::InvalidHorizon {
                requested: days,
                reason: format!("horizon is below the minimum of {} days", self.min),
            });
        }
        if let Some(step) = self.step {
            let off_grid = days > 0
                && days != i64::from(self.default)
                && (days - i64::from(self.min)) % i64::from(step.max(1)) != 0;
            if off_grid {
                return Err(ForecastError::InvalidHorizon {
                    requested: days,
                    reason: format!("horizon must move in steps of {} days from {}", step, self.min),
                });
            }
        }
        Horizon::new(days, self.max)
    }

    /// The control's initial value
    pub fn default_horizon(&self) -> Result<Horizon> {
        self.control_value(i64::from(self.default))
    }
}

/// One predicted day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Predicted prices for consecutive days after the last observation
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    points: Vec<ForecastPoint>,
    model_name: String,
}

impl ForecastResult {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Name of the model that produced the forecast
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Table with columns `Data` and `Previsao`, prices rounded to cents
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates = self.dates();
        let prices: Vec<f64> = self.points.iter().map(|p| round2(p.price)).collect();
        let df = DataFrame::new(vec![
            Series::new(DATE_COLUMN, dates.as_slice()),
            Series::new(FORECAST_COLUMN, prices.as_slice()),
        ])?;
        Ok(df)
    }

    /// Export the rounded table as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record([DATE_COLUMN, FORECAST_COLUMN])?;
        for point in &self.points {
            writer.write_record([
                point.date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", round2(point.price)),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Forecast `horizon` days past the end of `series`
pub fn forecast(
    model: &ForecastModel,
    series: &ObservedSeries,
    horizon: Horizon,
) -> Result<ForecastResult> {
    let steps = horizon.days() as usize;
    let values = model.predict(steps)?;
    if values.len() != steps {
        return Err(ForecastError::Model(MathError::InvalidInput(format!(
            "model returned {} predictions for a horizon of {}",
            values.len(),
            steps
        ))));
    }

    let points: Vec<ForecastPoint> = future_dates(series.last_date(), steps)
        .into_iter()
        .zip(values)
        .map(|(date, price)| ForecastPoint { date, price })
        .collect();

    debug!(
        model = %model.name(),
        horizon = steps,
        first = ?points.first().map(|p| p.date),
        "Produced forecast"
    );

    Ok(ForecastResult {
        points,
        model_name: model.name(),
    })
}

/// [`forecast`] for an unvalidated number of days
pub fn forecast_days(
    model: &ForecastModel,
    series: &ObservedSeries,
    days: i64,
    max: u32,
) -> Result<ForecastResult> {
    forecast(model, series, Horizon::new(days, max)?)
}
