use crate::ml::ForecastRow;
use super::session::SubmissionState;

pub const UNIT: &str = "W/m²";

pub fn render_forecast(row: &ForecastRow) -> String {
    format!(
        "Solar Irradiance Prediction\n\
         Date/Time: {}\n\
         Predicted Irradiance: {:.2} {unit}\n\
         Prediction Interval: {:.2} {unit} - {:.2} {unit}",
        row.ds.format("%B %d, %Y %H:%M:%S"),
        row.yhat,
        row.yhat_lower,
        row.yhat_upper,
        unit = UNIT,
    )
}

pub fn render_state(state: &SubmissionState) -> Option<String> {
    match state {
        SubmissionState::Success(row) => Some(render_forecast(row)),
        SubmissionState::Failure(message) => Some(message.clone()),
        SubmissionState::Idle | SubmissionState::Submitting => None,
    }
}
