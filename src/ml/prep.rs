use tracing::debug;

use crate::api::datetime::parse_timestamp;
use crate::api::{PredictionRequest, DATETIME_FIELD};
use crate::error::RequestError;
use super::models::FeatureRow;

/// Turns validated requests into model rows: `DATETIME` is parsed onto the
/// `ds` axis and dropped from the columns, and rows come back sorted by `ds`.
pub fn prepare_rows(requests: &[PredictionRequest]) -> Result<Vec<FeatureRow>, RequestError> {
    let mut rows = requests
        .iter()
        .map(prepare_row)
        .collect::<Result<Vec<_>, _>>()?;

    // stable, so equal timestamps keep submission order
    rows.sort_by_key(|row| row.ds);

    debug!("Prepared {} feature rows", rows.len());
    Ok(rows)
}

pub fn prepare_row(request: &PredictionRequest) -> Result<FeatureRow, RequestError> {
    let ds = parse_timestamp(&request.datetime).ok_or_else(|| RequestError::ParsingError {
        field: DATETIME_FIELD.to_string(),
        raw: request.datetime.clone(),
    })?;

    let features = request
        .numeric_columns()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    Ok(FeatureRow { ds, features })
}
