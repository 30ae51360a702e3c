use tracing::debug;

use crate::api::{self, PredictionRequest};
use crate::error::{RequestError, ServiceError};
use super::engine::ModelStore;
use super::models::ForecastRow;
use super::prep::prepare_rows;

/// The `/predict` pipeline: decode, validate, prepare, infer.
#[derive(Clone)]
pub struct ForecastPredictor {
    store: ModelStore,
}

impl ForecastPredictor {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Runs the whole pipeline over a raw request body.
    pub async fn predict_body(&self, body: &[u8]) -> Result<Vec<ForecastRow>, ServiceError> {
        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| RequestError::MalformedBody(e.to_string()))?;
        let request = api::validate(&payload)?;

        self.predict_requests(&[request]).await
    }

    pub async fn predict_requests(&self, requests: &[PredictionRequest]) -> Result<Vec<ForecastRow>, ServiceError> {
        let rows = prepare_rows(requests)?;
        debug!("Forecasting {} rows with model {}", rows.len(), self.store.model_version());

        let forecast = self.store.predict_with_timeout(rows).await?;
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::tests::example_request;
    use crate::error::MLError;
    use crate::ml::models::tests::sample_artifact;
    use crate::ml::ForecastModel;
    use std::time::Duration;

    fn predictor() -> ForecastPredictor {
        let model = ForecastModel::from_artifact(sample_artifact()).unwrap();
        ForecastPredictor::new(ModelStore::with_model(model, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_predict_body_happy_path() {
        let body = serde_json::to_vec(&example_request()).unwrap();

        let forecast = predictor().predict_body(&body).await.unwrap();

        assert_eq!(forecast.len(), 1);
        assert_eq!(api::datetime::format_timestamp(&forecast[0].ds), "2024-06-01T12:00:00");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let err = predictor().predict_body(b"{not json").await.unwrap_err();
        assert!(matches!(err, ServiceError::Request(RequestError::MalformedBody(_))));
    }

    #[tokio::test]
    async fn test_stage_errors_keep_their_kind() {
        let mut request = example_request();
        request.datetime = "yesterday".to_string();
        let err = predictor().predict_requests(&[request]).await.unwrap_err();
        assert_eq!(err.kind(), "parsing_error");

        let err = predictor().predict_requests(&[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Model(MLError::InferenceError(_))));
    }
}
