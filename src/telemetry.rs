use std::time::Duration;

use anyhow::Result;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

pub const REQUESTS_TOTAL: &str = "solar_forecast_requests_total";
pub const INFERENCE_SECONDS: &str = "solar_forecast_inference_seconds";

/// Installs the global Prometheus recorder. Without it every metric call
/// below is a no-op.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_request(outcome: &'static str) {
    counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_inference(elapsed: Duration) {
    histogram!(INFERENCE_SECONDS).record(elapsed.as_secs_f64());
}
