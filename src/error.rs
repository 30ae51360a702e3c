use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("Model artifact error: {0}")]
    ArtifactError(String),

    #[error("{0}")]
    InferenceError(String),

    #[error("Inference timed out after {}ms", .0.as_millis())]
    InferenceTimeout(Duration),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("{field}: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("{field}: unable to parse '{raw}' as an ISO-8601 date-time")]
    ParsingError { field: String, raw: String },

    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),
}

/// Everything a prediction call can fail with, as seen by the HTTP handler.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Model(#[from] MLError),
}

impl ServiceError {
    /// Label used for the `outcome` dimension of request metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Request(RequestError::ValidationError { .. }) => "validation_error",
            ServiceError::Request(RequestError::ParsingError { .. }) => "parsing_error",
            ServiceError::Request(RequestError::MalformedBody(_)) => "validation_error",
            ServiceError::Model(MLError::ArtifactError(_)) => "artifact_error",
            ServiceError::Model(MLError::InferenceError(_)) => "inference_error",
            ServiceError::Model(MLError::InferenceTimeout(_)) => "inference_timeout",
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Unknown input field: {0}")]
    UnknownField(String),

    #[error("Request to prediction service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from prediction service: {0}")]
    UnexpectedResponse(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}
