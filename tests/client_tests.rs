use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tokio::net::TcpListener;

use solar_forecast::api::ROOT_NOTE;
use solar_forecast::client::{render_state, ForecastClient, InputForm, Session, SubmissionState};
use solar_forecast::config::ClientConfig;
use solar_forecast::ml::ModelStore;
use solar_forecast::web::PredictionServer;

async fn spawn_service() -> String {
    let path = format!("{}/models/prophet_best_model.json", env!("CARGO_MANIFEST_DIR"));
    let store = ModelStore::load(path, Duration::from_secs(5)).unwrap();
    let server = PredictionServer::new(store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client(url: &str) -> ForecastClient {
    ForecastClient::new(&ClientConfig {
        service_url: url.to_string(),
        request_timeout_secs: 5,
    })
    .unwrap()
}

fn noon_form() -> InputForm {
    InputForm::new(
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_root_note_over_http() {
    let url = spawn_service().await;

    let note = client(&url).root_note().await.unwrap();

    assert_eq!(note.note, ROOT_NOTE);
}

#[tokio::test]
async fn test_submit_renders_forecast() {
    let url = spawn_service().await;
    let mut session = Session::new();

    let state = client(&url).submit(&mut session, &noon_form()).await.unwrap();

    let row = match state {
        SubmissionState::Success(row) => row.clone(),
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(row.ds.to_string(), "2024-06-01 12:00:00");
    assert!(row.yhat_lower <= row.yhat && row.yhat <= row.yhat_upper);

    let text = render_state(session.state()).unwrap();
    assert!(text.contains("Date/Time: June 01, 2024 12:00:00"));
    assert!(text.contains(&format!("Predicted Irradiance: {:.2} W/m²", row.yhat)));

    session.reset().unwrap();
    assert_eq!(session.state(), &SubmissionState::Idle);
}

#[tokio::test]
async fn test_service_error_shown_verbatim() {
    let url = spawn_service().await;
    let mut request = noon_form().to_request();
    request.datetime = "not-a-date".to_string();

    let outcome = client(&url).predict(&request).await.unwrap();

    assert_eq!(
        outcome.unwrap_err(),
        "DATETIME: unable to parse 'not-a-date' as an ISO-8601 date-time"
    );
}

#[tokio::test]
async fn test_non_success_status_is_failure() {
    let url = spawn_service().await;
    let client = client(&format!("{}/missing", url));
    let mut session = Session::new();

    let state = client.submit(&mut session, &noon_form()).await.unwrap();

    assert!(matches!(state, SubmissionState::Failure(m) if m.starts_with("Failed to fetch data")));
}

#[tokio::test]
async fn test_unreachable_service_is_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", addr));
    let mut session = Session::new();

    let state = client.submit(&mut session, &noon_form()).await.unwrap();

    assert!(matches!(state, SubmissionState::Failure(_)));
}
