use arima_math::{fit_arima, ArimaOrder, InformationCriterion};
use brent_forecast::config::{ModelConfig, ModelVariant, StalenessPolicy};
use brent_forecast::data::ObservedSeries;
use brent_forecast::error::{ForecastError, Result};
use brent_forecast::forecaster::forecast_days;
use brent_forecast::models::artifact::ARTIFACT_FORMAT_VERSION;
use brent_forecast::models::{
    cached_model, evict_model, is_model_cached, load_artifact, provider_from_config,
    save_artifact, ArtifactProvider, AutoArimaProvider, ForecastModel, ModelOrigin,
    ModelProvider,
};
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn simulated_series(n: usize, seed: u64, last: NaiveDate) -> ObservedSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let first = last - Duration::days(n as i64 - 1);
    let mut level = 70.0;
    let observations = (0..n)
        .map(|i| {
            level += noise.sample(&mut rng);
            (first + Duration::days(i as i64), level)
        })
        .collect();
    ObservedSeries::from_observations(observations).unwrap()
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn fixed_model(series: &ObservedSeries) -> ForecastModel {
    let fitted = fit_arima(series.prices(), ArimaOrder::new(1, 1, 0), true).unwrap();
    ForecastModel::new(fitted, series.last_date(), series.len(), ModelOrigin::Trained)
}

/// Fits a fixed order and counts how often it is asked to
struct CountingProvider {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

impl ModelProvider for CountingProvider {
    fn cache_key(&self, series: &ObservedSeries) -> String {
        format!("counting:{}:{:016x}", self.name, series.fingerprint())
    }

    fn obtain_model(&self, series: &ObservedSeries) -> Result<ForecastModel> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(fixed_model(series))
    }
}

#[test]
fn test_auto_arima_provider_trains_on_series() {
    let series = simulated_series(300, 21, jan(8));
    let provider = AutoArimaProvider::default();

    let model = provider.obtain_model(&series).unwrap();

    assert_eq!(model.trained_through(), jan(8));
    assert_eq!(model.observations(), 300);
    assert_eq!(model.origin(), &ModelOrigin::Trained);
    assert!(model.name().starts_with("ARIMA("));
    assert_eq!(model.predict(5).unwrap().len(), 5);
}

#[test]
fn test_auto_arima_provider_recovers_random_walk_order() {
    let series = simulated_series(1500, 12, jan(8));
    let config = ModelConfig {
        criterion: InformationCriterion::Bic,
        max_d: 1,
        ..ModelConfig::default()
    };
    let provider = AutoArimaProvider::from_config(&config);

    let model = provider.obtain_model(&series).unwrap();
    let order = model.fitted().order();
    assert_eq!((order.p, order.d, order.q), (0, 1, 0), "chose {}", model.name());
}

#[test]
fn test_evicted_model_is_trained_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        name: "evict",
        calls: Arc::clone(&calls),
    };
    let series = simulated_series(80, 13, jan(8));

    cached_model(&provider, &series).unwrap();
    assert!(is_model_cached(&provider, &series));
    assert!(evict_model(&provider, &series));
    assert!(!is_model_cached(&provider, &series));

    cached_model(&provider, &series).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_training_is_deterministic() {
    let series = simulated_series(200, 5, jan(8));
    let provider = AutoArimaProvider::default();

    let first = provider.obtain_model(&series).unwrap();
    let second = provider.obtain_model(&series).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cache_key_depends_on_series_content() {
    let provider = AutoArimaProvider::default();
    let a = simulated_series(50, 1, jan(8));
    let b = simulated_series(50, 2, jan(8));

    assert_eq!(provider.cache_key(&a), provider.cache_key(&a.clone()));
    assert_ne!(provider.cache_key(&a), provider.cache_key(&b));
}

#[test]
fn test_model_cache_trains_once_per_series() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        name: "once-per-series",
        calls: Arc::clone(&calls),
    };
    let a = simulated_series(80, 3, jan(8));
    let b = simulated_series(80, 4, jan(8));

    let first = cached_model(&provider, &a).unwrap();
    let again = cached_model(&provider, &a).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cached_model(&provider, &b).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_artifact_round_trip_reproduces_predictions() {
    let series = simulated_series(150, 9, jan(8));
    let model = fixed_model(&series);

    let dir = tempdir().unwrap();
    let path = dir.path().join("modelo.json");
    save_artifact(&model, &path).unwrap();

    let artifact = load_artifact(&path).unwrap();
    assert_eq!(artifact.format_version, ARTIFACT_FORMAT_VERSION);
    assert_eq!(artifact.trained_through, jan(8));
    assert_eq!(artifact.observations, 150);

    let provider = ArtifactProvider::new(&path, StalenessPolicy::Reject);
    let loaded = provider.obtain_model(&series).unwrap();
    assert_eq!(loaded.origin(), &ModelOrigin::Artifact(path.clone()));

    let expected = forecast_days(&model, &series, 30, 180).unwrap();
    let actual = forecast_days(&loaded, &series, 30, 180).unwrap();
    assert_eq!(expected.values(), actual.values());
    assert_eq!(expected.dates(), actual.dates());
}

#[test]
fn test_missing_artifact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let provider = ArtifactProvider::new(&path, StalenessPolicy::Warn);
    let series = simulated_series(20, 1, jan(8));

    match provider.obtain_model(&series) {
        Err(ForecastError::ArtifactNotFound(reported)) => assert_eq!(reported, path),
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
}

#[test]
fn test_corrupt_artifact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    assert!(matches!(
        load_artifact(&path),
        Err(ForecastError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_artifact_with_unknown_version() {
    let series = simulated_series(60, 2, jan(8));
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.json");
    save_artifact(&fixed_model(&series), &path).unwrap();

    let mut document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    document["format_version"] = serde_json::json!(2);
    std::fs::write(&path, document.to_string()).unwrap();

    match load_artifact(&path) {
        Err(ForecastError::ArtifactCorrupt { reason, .. }) => {
            assert!(reason.contains("format version"))
        }
        other => panic!("expected ArtifactCorrupt, got {:?}", other),
    }
}

#[test]
fn test_artifact_missing_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"format_version": 1, "observations": 3}"#).unwrap();

    assert!(matches!(
        load_artifact(&path),
        Err(ForecastError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_stale_artifact_policies() {
    let training = simulated_series(100, 6, jan(5));
    let current = simulated_series(101, 6, jan(6));
    let dir = tempdir().unwrap();
    let path = dir.path().join("stale.json");
    save_artifact(&fixed_model(&training), &path).unwrap();

    let warn = ArtifactProvider::new(&path, StalenessPolicy::Warn);
    let model = warn.obtain_model(&current).unwrap();
    assert!(warn.check_compatibility(&model, &current).is_ok());
    assert!(warn.check_compatibility(&model, &training).is_ok());

    let reject = ArtifactProvider::new(&path, StalenessPolicy::Reject);
    assert!(reject.check_compatibility(&model, &training).is_ok());
    match reject.check_compatibility(&model, &current) {
        Err(ForecastError::StaleArtifact {
            trained_through,
            series_end,
        }) => {
            assert_eq!(trained_through, jan(5));
            assert_eq!(series_end, jan(6));
        }
        other => panic!("expected StaleArtifact, got {:?}", other),
    }
}

#[test]
fn test_cached_artifact_is_rechecked_against_each_series() {
    let training = simulated_series(100, 7, jan(5));
    let current = simulated_series(101, 7, jan(6));
    let dir = tempdir().unwrap();
    let path = dir.path().join("cached.json");
    save_artifact(&fixed_model(&training), &path).unwrap();

    let provider = ArtifactProvider::new(&path, StalenessPolicy::Reject);
    assert!(cached_model(&provider, &training).is_ok());
    assert!(matches!(
        cached_model(&provider, &current),
        Err(ForecastError::StaleArtifact { .. })
    ));
}

#[test]
fn test_provider_selection_from_config() {
    let dir = tempdir().unwrap();
    let config = ModelConfig {
        variant: ModelVariant::Artifact,
        artifact_path: dir.path().join("none.json"),
        ..ModelConfig::default()
    };
    let series = simulated_series(20, 1, jan(8));

    let provider = provider_from_config(&config);
    assert!(provider.cache_key(&series).starts_with("artifact:"));
    assert!(matches!(
        provider.obtain_model(&series),
        Err(ForecastError::ArtifactNotFound(_))
    ));

    let provider = provider_from_config(&ModelConfig::default());
    assert!(provider.cache_key(&series).starts_with("train:"));
}
