use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use solar_forecast::ml::ModelStore;
use solar_forecast::telemetry::{self, INFERENCE_SECONDS, REQUESTS_TOTAL};
use solar_forecast::web::PredictionServer;

fn predict_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(app: Router, request: Request<Body>) -> String {
    let response = app.oneshot(request).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// The recorder is process-global, so this file holds a single test.
#[tokio::test]
async fn test_requests_and_inference_are_exported() {
    let handle = telemetry::install_recorder().unwrap();
    let path = format!("{}/models/prophet_best_model.json", env!("CARGO_MANIFEST_DIR"));
    let store = ModelStore::load(path, Duration::from_secs(5)).unwrap();
    let app = PredictionServer::new(store).with_metrics(handle).router();

    let mut payload = json!({
        "DATETIME": "2024-06-01T12:00:00",
        "Avg_Zenith_Angle_degrees": 85.0,
        "Avg_Sun_Flag": 8,
        "Avg_Opaque_Cloud_Cover": 10.0,
        "Avg_Blue_Red_min": 0.96,
        "Avg_Global_CMP22_vent_cor": 0.96,
        "Avg_BRBG_Total_Cloud_Cover": 0.96,
        "Avg_Azimuth_Angle_degrees": 0.96,
        "Avg_Albedo_CMP11": 0.96,
        "Avg_Tower_Dew_Point_Temp_deg_C": 0.96,
        "Avg_Total_Cloud_Cover": 0.96
    });
    let success = body_text(app.clone(), predict_request(payload.to_string())).await;
    assert!(success.contains("predictions"));

    payload["DATETIME"] = json!("not-a-date");
    let failure = body_text(app.clone(), predict_request(payload.to_string())).await;
    assert!(failure.contains("error"));

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let rendered = body_text(app, request).await;

    assert!(rendered.contains(REQUESTS_TOTAL));
    assert!(rendered.contains(r#"outcome="success""#));
    assert!(rendered.contains(r#"outcome="parsing_error""#));
    assert!(rendered.contains(INFERENCE_SECONDS));
}
