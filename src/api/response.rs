use serde::{Deserialize, Serialize};

use crate::ml::ForecastRow;

pub const ROOT_NOTE: &str = "Hello Dear User, please jump to /predict/ to view the predictions! ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNote {
    #[serde(rename = "Note")]
    pub note: String,
}

impl Default for RootNote {
    fn default() -> Self {
        Self {
            note: ROOT_NOTE.to_string(),
        }
    }
}

/// Body of every `/predict` reply; failures still travel with HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Predictions { predictions: Vec<ForecastRow> },
    Error { error: String },
}

impl PredictResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PredictResponse::Error {
            error: message.into(),
        }
    }
}
