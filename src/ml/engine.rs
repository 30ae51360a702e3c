use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::MLError;
use crate::telemetry;
use super::models::{FeatureRow, ForecastModel, ForecastRow, ModelArtifact};

/// Process-wide owner of the fitted model. Loaded once, never mutated; clones
/// share the same model.
#[derive(Clone)]
pub struct ModelStore {
    model: Arc<ForecastModel>,
    artifact_path: PathBuf,
    inference_timeout: Duration,
}

impl ModelStore {
    pub fn load(path: impl AsRef<Path>, inference_timeout: Duration) -> Result<Self, MLError> {
        let path = path.as_ref();
        info!("Loading forecast model from {}", path.display());

        let bytes = std::fs::read(path).map_err(|e| {
            MLError::ArtifactError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|e| {
            MLError::ArtifactError(format!("{} is not a valid model artifact: {}", path.display(), e))
        })?;
        let model = ForecastModel::from_artifact(artifact)?;
        debug!(
            "Model expects columns: {:?}",
            model.regressor_names().collect::<Vec<_>>()
        );

        info!("Model store initialized successfully");

        Ok(Self::with_model(model, inference_timeout).at_path(path))
    }

    /// Loads `config.artifact_path` with the configured timeout and horizon.
    pub fn from_config(config: &ModelConfig) -> Result<Self, MLError> {
        let store = Self::load(&config.artifact_path, config.inference_timeout())?
            .with_max_horizon_days(config.max_horizon_days);
        Ok(store)
    }

    pub fn with_model(model: ForecastModel, inference_timeout: Duration) -> Self {
        Self {
            model: Arc::new(model),
            artifact_path: PathBuf::new(),
            inference_timeout,
        }
    }

    fn at_path(mut self, path: &Path) -> Self {
        self.artifact_path = path.to_path_buf();
        self
    }

    pub fn with_max_horizon_days(mut self, days: u32) -> Self {
        Arc::make_mut(&mut self.model).set_max_horizon_days(days);
        self
    }

    pub fn model_version(&self) -> &str {
        &self.model.model_version
    }

    pub fn max_horizon_days(&self) -> u32 {
        self.model.max_horizon_days()
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn inference_timeout(&self) -> Duration {
        self.inference_timeout
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<ForecastRow>, MLError> {
        self.model.predict(rows)
    }

    /// Runs `predict` on the blocking pool, bounded by the store's timeout.
    /// On expiry the blocking task is told to stop.
    pub async fn predict_with_timeout(&self, rows: Vec<FeatureRow>) -> Result<Vec<ForecastRow>, MLError> {
        let model = self.model.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let started = Instant::now();

        let flag = cancel.clone();
        let task = tokio::task::spawn_blocking(move || model.predict_cancellable(&rows, &flag));
        let result = match timeout(self.inference_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(MLError::InferenceError(format!(
                "inference task failed: {}",
                join_error
            ))),
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                warn!("Inference exceeded {:?}, cancelling", self.inference_timeout);
                Err(MLError::InferenceTimeout(self.inference_timeout))
            }
        };

        let elapsed = started.elapsed();
        telemetry::record_inference(elapsed);
        debug!("Inference finished in {:?}", elapsed);

        result
    }
}
