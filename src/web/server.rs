use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::{PredictResponse, RootNote};
use crate::ml::{ForecastPredictor, ModelStore};
use crate::telemetry;

#[derive(Clone)]
pub struct PredictionServer {
    predictor: ForecastPredictor,
    metrics: Option<PrometheusHandle>,
}

impl PredictionServer {
    pub fn new(store: ModelStore) -> Self {
        Self {
            predictor: ForecastPredictor::new(store),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/predict", post(predict))
            .route("/predict/", post(predict))
            .route("/metrics", get(render_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub async fn start(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            "Prediction service listening on http://{} (model {})",
            listener.local_addr()?,
            self.predictor.store().model_version()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Prediction service stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn root() -> Json<RootNote> {
    Json(RootNote::default())
}

async fn predict(State(server): State<PredictionServer>, body: Bytes) -> Json<PredictResponse> {
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id);

    let result = server.predictor.predict_body(&body).instrument(span.clone()).await;

    let _entered = span.enter();
    match result {
        Ok(predictions) => {
            telemetry::record_request("success");
            info!("Returned {} forecast rows", predictions.len());
            Json(PredictResponse::Predictions { predictions })
        }
        Err(e) => {
            telemetry::record_request(e.kind());
            warn!("Prediction failed ({}): {}", e.kind(), e);
            Json(PredictResponse::error(e.to_string()))
        }
    }
}

async fn render_metrics(State(server): State<PredictionServer>) -> impl IntoResponse {
    server
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
