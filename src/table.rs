//! Forecast table view

use crate::error::Result;
use brent_forecast::data::DATE_COLUMN;
use brent_forecast::forecaster::FORECAST_COLUMN;
use brent_forecast::ForecastResult;
use polars::prelude::*;

/// The forecast as a date-indexed table rounded to cents
pub fn forecast_table(result: &ForecastResult) -> Result<DataFrame> {
    Ok(result.to_dataframe()?)
}

/// Plain text rendering of every row of the forecast table
pub fn format_table(df: &DataFrame) -> Result<String> {
    let dates = df.column(DATE_COLUMN)?.date()?;
    let prices = df.column(FORECAST_COLUMN)?.f64()?;

    let mut text = String::new();
    text.push_str(&format!("{:<12}{:>10}\n", DATE_COLUMN, FORECAST_COLUMN));
    for (date, price) in dates.as_date_iter().zip(prices.into_iter()) {
        let date = date.map(|d| d.to_string()).unwrap_or_default();
        let price = price.map(|p| format!("{:.2}", p)).unwrap_or_default();
        text.push_str(&format!("{:<12}{:>10}\n", date, price));
    }
    Ok(text)
}
