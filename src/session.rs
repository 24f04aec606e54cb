//! Dashboard session
//!
//! Ties the series loader, the configured model provider and the forecaster
//! together. A view is computed in full before anything is rendered, so a
//! failure leaves no partial output behind.

use crate::charts::{render_history_chart, render_zoom_chart};
use crate::error::Result;
use crate::settings::AppConfig;
use crate::table::{forecast_table, format_table};
use brent_forecast::data::{DocumentSource, HttpSource};
use brent_forecast::forecaster::forecast;
use brent_forecast::models::{cached_model, evict_model, provider_from_config};
use brent_forecast::{
    ForecastModel, ForecastResult, Horizon, ModelProvider, ObservedSeries, SeriesLoader,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// File name of the full history chart
pub const HISTORY_CHART_FILE: &str = "historico.svg";
/// File name of the zoomed chart
pub const ZOOM_CHART_FILE: &str = "zoom_previsao.svg";
/// File name of the CSV export
pub const FORECAST_CSV_FILE: &str = "previsao.csv";

/// Everything shown for one horizon
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub series: Arc<ObservedSeries>,
    pub model: Arc<ForecastModel>,
    pub horizon: Horizon,
    pub forecast: ForecastResult,
}

/// Files and text produced by [`Dashboard::render`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedView {
    pub history_chart: PathBuf,
    pub zoom_chart: PathBuf,
    pub csv: Option<PathBuf>,
    pub table: String,
}

/// The forecasting dashboard
pub struct Dashboard<S = HttpSource> {
    config: AppConfig,
    loader: SeriesLoader<S>,
    provider: Box<dyn ModelProvider>,
}

impl Dashboard<HttpSource> {
    /// Dashboard reading the configured remote page
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let loader = SeriesLoader::from_config(&config.forecast.source)?;
        Ok(Self::new(config, loader))
    }
}

impl<S: DocumentSource> Dashboard<S> {
    pub fn new(config: AppConfig, loader: SeriesLoader<S>) -> Self {
        let provider = provider_from_config(&config.forecast.model);
        Self {
            config,
            loader,
            provider,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The horizon the control starts at
    pub fn default_horizon(&self) -> Result<Horizon> {
        Ok(self.config.forecast.horizon.default_horizon()?)
    }

    /// Compute the view for a horizon picked on the control
    pub fn view(&self, days: i64) -> Result<DashboardView> {
        let horizon = self.config.forecast.horizon.control_value(days)?;
        let series = self.loader.load_cached()?;
        let model = cached_model(self.provider.as_ref(), &series)?;
        let forecast = forecast(&model, &series, horizon)?;

        info!(
            horizon = horizon.days(),
            model = %model.name(),
            last_observation = %series.last_date(),
            "Built dashboard view"
        );

        Ok(DashboardView {
            series,
            model,
            horizon,
            forecast,
        })
    }

    /// Write both charts (and optionally the CSV) to `out_dir`
    pub fn render(&self, view: &DashboardView, out_dir: &Path, csv: bool) -> Result<RenderedView> {
        fs::create_dir_all(out_dir)?;
        let output = &self.config.output;
        let size = (output.chart_width, output.chart_height);

        let history_chart = out_dir.join(HISTORY_CHART_FILE);
        render_history_chart(&view.series, &view.forecast, &history_chart, size)?;

        let zoom_chart = out_dir.join(ZOOM_CHART_FILE);
        render_zoom_chart(
            &view.series,
            &view.forecast,
            output.zoom_window,
            &zoom_chart,
            size,
        )?;

        let table = format_table(&forecast_table(&view.forecast)?)?;

        let csv = if csv {
            let path = out_dir.join(FORECAST_CSV_FILE);
            view.forecast.write_csv(&path)?;
            Some(path)
        } else {
            None
        };

        info!(dir = %out_dir.display(), "Rendered dashboard");
        Ok(RenderedView {
            history_chart,
            zoom_chart,
            csv,
            table,
        })
    }

    /// Drop the memoized series so the next view fetches it again
    ///
    /// The model memoized for the dropped series is evicted with it.
    pub fn refresh(&self) -> bool {
        if let Some(previous) = self.loader.cached() {
            evict_model(self.provider.as_ref(), &previous);
        }
        self.loader.refresh()
    }
}
