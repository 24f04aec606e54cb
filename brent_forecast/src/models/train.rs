//! Train-on-demand provider

use super::{ForecastModel, ModelOrigin, ModelProvider};
use crate::config::ModelConfig;
use crate::data::ObservedSeries;
use crate::error::Result;
use arima_math::{AutoArima, InformationCriterion};
use tracing::{debug, info};

/// Fits a non-seasonal ARIMA with a stepwise order search
#[derive(Debug, Clone, PartialEq)]
pub struct AutoArimaProvider {
    criterion: InformationCriterion,
    max_p: usize,
    max_q: usize,
    max_d: usize,
    max_order: usize,
}

impl Default for AutoArimaProvider {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

impl AutoArimaProvider {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            criterion: config.criterion,
            max_p: config.max_p,
            max_q: config.max_q,
            max_d: config.max_d,
            max_order: config.max_order,
        }
    }

    pub fn criterion(&self) -> InformationCriterion {
        self.criterion
    }

    fn search(&self) -> AutoArima {
        AutoArima::new()
            .with_criterion(self.criterion)
            .with_max_p(self.max_p)
            .with_max_q(self.max_q)
            .with_max_d(self.max_d)
            .with_max_order(self.max_order)
    }
}

impl ModelProvider for AutoArimaProvider {
    fn cache_key(&self, series: &ObservedSeries) -> String {
        format!(
            "train:{:?}:p{}:q{}:d{}:o{}:{:016x}",
            self.criterion,
            self.max_p,
            self.max_q,
            self.max_d,
            self.max_order,
            series.fingerprint()
        )
    }

    fn obtain_model(&self, series: &ObservedSeries) -> Result<ForecastModel> {
        info!(
            observations = series.len(),
            criterion = ?self.criterion,
            "Selecting ARIMA order"
        );

        let fit = self.search().fit(series.prices())?;
        for candidate in &fit.candidates {
            debug!(
                order = %candidate.order,
                constant = candidate.with_constant,
                score = ?candidate.score,
                "Evaluated candidate"
            );
        }
        info!(
            model = %fit.model.name(),
            score = fit.score,
            candidates = fit.candidates.len(),
            "Selected model"
        );

        Ok(ForecastModel::new(
            fit.model,
            series.last_date(),
            series.len(),
            ModelOrigin::Trained,
        ))
    }
}
