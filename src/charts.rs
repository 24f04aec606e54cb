//! Price charts
//!
//! Both charts draw the observed prices and the forecast as two line series
//! on a shared date axis and are written as SVG files.

use crate::error::{DashboardError, Result};
use brent_forecast::{ForecastResult, ObservedSeries};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::path::Path;

const HISTORY_LABEL: &str = "Histórico";
const ZOOM_LABEL: &str = "Últimos 12 meses";

fn chart_error<E: std::fmt::Display>(err: E) -> DashboardError {
    DashboardError::Chart(err.to_string())
}

/// Full history followed by the forecast
pub fn render_history_chart<P: AsRef<Path>>(
    series: &ObservedSeries,
    forecast: &ForecastResult,
    output_path: P,
    size: (u32, u32),
) -> Result<()> {
    draw_price_chart(
        "Histórico completo",
        (series.dates(), series.prices()),
        HISTORY_LABEL,
        forecast,
        output_path.as_ref(),
        size,
    )
}

/// The trailing `window` observations followed by the forecast
pub fn render_zoom_chart<P: AsRef<Path>>(
    series: &ObservedSeries,
    forecast: &ForecastResult,
    window: usize,
    output_path: P,
    size: (u32, u32),
) -> Result<()> {
    draw_price_chart(
        "Zoom + Previsão",
        series.tail(window),
        ZOOM_LABEL,
        forecast,
        output_path.as_ref(),
        size,
    )
}

fn draw_price_chart(
    title: &str,
    observed: (&[NaiveDate], &[f64]),
    observed_label: &str,
    forecast: &ForecastResult,
    output_path: &Path,
    size: (u32, u32),
) -> Result<()> {
    let (dates, prices) = observed;
    let origin = match dates.first() {
        Some(first) => *first,
        None => {
            return Err(DashboardError::Chart(
                "no observations to draw".to_string(),
            ))
        }
    };
    let day = |date: &NaiveDate| (*date - origin).num_days();

    let x_end = forecast
        .last_date()
        .or_else(|| dates.last().copied())
        .map(|d| day(&d))
        .unwrap_or(0)
        .max(1);
    let forecast_values = forecast.values();
    let (y_min, y_max) = value_range(prices.iter().chain(forecast_values.iter()).copied());

    let root = SVGBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0i64..x_end, y_min..y_max)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| (origin + Duration::days(*x)).format("%Y-%m").to_string())
        .y_desc("US$")
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(LineSeries::new(
            dates.iter().zip(prices.iter()).map(|(d, p)| (day(d), *p)),
            &BLUE,
        ))
        .map_err(chart_error)?
        .label(observed_label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    let forecast_label = format!("Previsão ({} dias)", forecast.len());
    chart
        .draw_series(LineSeries::new(
            forecast.points().iter().map(|p| (day(&p.date), p.price)),
            &RED,
        ))
        .map_err(chart_error)?
        .label(forecast_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    Ok(())
}

/// Padded (min, max) of the plotted prices
fn value_range<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}
