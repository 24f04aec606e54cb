//! Forecasting models and the providers that supply them

pub mod artifact;
pub mod train;

use crate::cache::MemoCache;
use crate::config::{ModelConfig, ModelVariant};
use crate::data::ObservedSeries;
use crate::error::Result;
use arima_math::FittedArima;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub use self::artifact::{load_artifact, save_artifact, ArtifactProvider, ModelArtifact};
pub use self::train::AutoArimaProvider;

static MODEL_CACHE: Lazy<MemoCache<String, ForecastModel>> = Lazy::new(MemoCache::new);

/// Where a model came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Fitted in this process
    Trained,
    /// Read from a persisted artifact
    Artifact(PathBuf),
}

impl fmt::Display for ModelOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelOrigin::Trained => write!(f, "trained"),
            ModelOrigin::Artifact(path) => write!(f, "artifact {}", path.display()),
        }
    }
}

/// A fitted model ready to predict
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastModel {
    fitted: FittedArima,
    trained_through: NaiveDate,
    observations: usize,
    origin: ModelOrigin,
}

impl ForecastModel {
    pub fn new(
        fitted: FittedArima,
        trained_through: NaiveDate,
        observations: usize,
        origin: ModelOrigin,
    ) -> Self {
        Self {
            fitted,
            trained_through,
            observations,
            origin,
        }
    }

    /// Point predictions for the next `steps` days
    pub fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        Ok(self.fitted.forecast(steps)?)
    }

    /// Display name such as `ARIMA(1,1,1) with constant`
    pub fn name(&self) -> String {
        self.fitted.name()
    }

    pub fn fitted(&self) -> &FittedArima {
        &self.fitted
    }

    /// Last date of the series the model was fitted on
    pub fn trained_through(&self) -> NaiveDate {
        self.trained_through
    }

    /// Number of observations the model was fitted on
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn origin(&self) -> &ModelOrigin {
        &self.origin
    }
}

/// Supplies the model used for forecasting
pub trait ModelProvider: Send + Sync {
    /// Key under which the model for `series` is memoized
    fn cache_key(&self, series: &ObservedSeries) -> String;

    /// Produce a model for `series`
    fn obtain_model(&self, series: &ObservedSeries) -> Result<ForecastModel>;

    /// Check a (possibly memoized) model against the current series
    fn check_compatibility(&self, _model: &ForecastModel, _series: &ObservedSeries) -> Result<()> {
        Ok(())
    }
}

/// Build the provider selected by the configuration
pub fn provider_from_config(config: &ModelConfig) -> Box<dyn ModelProvider> {
    match config.variant {
        ModelVariant::Train => Box::new(AutoArimaProvider::from_config(config)),
        ModelVariant::Artifact => Box::new(ArtifactProvider::from_config(config)),
    }
}

/// Memoized [`ModelProvider::obtain_model`]
pub fn cached_model(
    provider: &dyn ModelProvider,
    series: &ObservedSeries,
) -> Result<Arc<ForecastModel>> {
    let key = provider.cache_key(series);
    let model = MODEL_CACHE.get_or_try_init(key.clone(), || {
        debug!(key = %key, "Model cache miss");
        provider.obtain_model(series)
    })?;
    provider.check_compatibility(&model, series)?;
    Ok(model)
}

/// Whether a model for `series` is memoized under `provider`'s key
pub fn is_model_cached(provider: &dyn ModelProvider, series: &ObservedSeries) -> bool {
    MODEL_CACHE.contains(&provider.cache_key(series))
}

/// Forget the model memoized for `series`
pub fn evict_model(provider: &dyn ModelProvider, series: &ObservedSeries) -> bool {
    let key = provider.cache_key(series);
    debug!(key = %key, "Evicting cached model");
    MODEL_CACHE.invalidate(&key)
}

/// Drop every memoized model
pub fn clear_model_cache() {
    MODEL_CACHE.clear();
}
