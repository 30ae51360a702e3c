use anyhow::Result;
use reqwest::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::api::{PredictResponse, PredictionRequest, RootNote};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::ml::ForecastRow;
use super::form::InputForm;
use super::session::{Session, SubmissionState};

/// HTTP client for the prediction service.
#[derive(Clone)]
pub struct ForecastClient {
    http_client: HttpClient,
    base_url: String,
}

impl ForecastClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!("Forecast client targeting {}", config.service_url);

        Ok(Self {
            http_client,
            base_url: config.service_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn root_note(&self) -> Result<RootNote, ClientError> {
        let note = self
            .http_client
            .get(format!("{}/", self.base_url))
            .send()
            .await?
            .json::<RootNote>()
            .await?;
        Ok(note)
    }

    /// Posts one request. `Ok(Err(message))` is a failure the service (or the
    /// HTTP layer) reported, to be shown to the user as-is.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<Result<ForecastRow, String>, ClientError> {
        let url = format!("{}/predict/", self.base_url);
        debug!("POST {} for {}", url, request.datetime);

        let response = self.http_client.post(&url).json(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Prediction service answered {}", status);
            return Ok(Err(format!("Failed to fetch data: {}", text)));
        }

        let body: PredictResponse = serde_json::from_str(&text)
            .map_err(|e| ClientError::UnexpectedResponse(format!("{}: {}", e, text)))?;

        match body {
            PredictResponse::Predictions { predictions } => predictions
                .into_iter()
                .next()
                .map(Ok)
                .ok_or_else(|| ClientError::UnexpectedResponse("empty predictions list".to_string())),
            PredictResponse::Error { error } => Ok(Err(error)),
        }
    }

    /// Drives one submission through `session`, leaving it in Success or
    /// Failure.
    pub async fn submit<'s>(&self, session: &'s mut Session, form: &InputForm) -> Result<&'s SubmissionState, ClientError> {
        session.begin()?;

        let outcome = match self.predict(&form.to_request()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(e.to_string()),
        };

        session.complete(outcome)?;
        Ok(session.state())
    }
}
