//! Persisted models
//!
//! An artifact is a JSON document holding the fitted parameters together
//! with the date range it was trained on. Documents carry a format version
//! and any other version is refused.

use super::{ForecastModel, ModelOrigin, ModelProvider};
use crate::config::{ModelConfig, StalenessPolicy};
use crate::data::ObservedSeries;
use crate::error::{ForecastError, Result};
use arima_math::FittedArima;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Version written by [`save_artifact`]
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// On-disk representation of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub trained_through: NaiveDate,
    pub observations: usize,
    pub model: FittedArima,
}

impl ModelArtifact {
    pub fn from_model(model: &ForecastModel) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            trained_through: model.trained_through(),
            observations: model.observations(),
            model: model.fitted().clone(),
        }
    }

    pub fn into_model(self, path: &Path) -> ForecastModel {
        ForecastModel::new(
            self.model,
            self.trained_through,
            self.observations,
            ModelOrigin::Artifact(path.to_path_buf()),
        )
    }
}

/// Write `model` to `path` as a JSON artifact
pub fn save_artifact<P: AsRef<Path>>(model: &ForecastModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let artifact = ModelArtifact::from_model(model);
    let json = serde_json::to_string_pretty(&artifact).map_err(io::Error::from)?;
    fs::write(path, json)?;

    info!(
        path = %path.display(),
        model = %model.name(),
        trained_through = %artifact.trained_through,
        "Saved model artifact"
    );
    Ok(())
}

/// Read and decode the artifact at `path`
pub fn load_artifact<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let corrupt = |reason: String| ForecastError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(corrupt(e.to_string())),
    };

    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    match document.get("format_version").and_then(|v| v.as_u64()) {
        Some(version) if version == u64::from(ARTIFACT_FORMAT_VERSION) => {}
        Some(version) => {
            return Err(corrupt(format!(
                "unsupported format version {}, expected {}",
                version, ARTIFACT_FORMAT_VERSION
            )))
        }
        None => return Err(corrupt("missing format_version".to_string())),
    }

    serde_json::from_value(document).map_err(|e| corrupt(e.to_string()))
}

/// Loads a model fitted offline; never trains
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactProvider {
    path: PathBuf,
    policy: StalenessPolicy,
}

impl ArtifactProvider {
    pub fn new<P: AsRef<Path>>(path: P, policy: StalenessPolicy) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            policy,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(&config.artifact_path, config.staleness)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelProvider for ArtifactProvider {
    fn cache_key(&self, _series: &ObservedSeries) -> String {
        format!("artifact:{}", self.path.display())
    }

    fn obtain_model(&self, _series: &ObservedSeries) -> Result<ForecastModel> {
        let artifact = load_artifact(&self.path)?;
        info!(
            path = %self.path.display(),
            model = %artifact.model.name(),
            trained_through = %artifact.trained_through,
            created_at = %artifact.created_at,
            "Loaded model artifact"
        );
        Ok(artifact.into_model(&self.path))
    }

    fn check_compatibility(&self, model: &ForecastModel, series: &ObservedSeries) -> Result<()> {
        let trained_through = model.trained_through();
        let series_end = series.last_date();
        if trained_through == series_end {
            return Ok(());
        }

        match self.policy {
            StalenessPolicy::Warn => {
                warn!(
                    %trained_through,
                    %series_end,
                    "Model artifact was trained on a different series cutoff"
                );
                Ok(())
            }
            StalenessPolicy::Reject => Err(ForecastError::StaleArtifact {
                trained_through,
                series_end,
            }),
        }
    }
}
