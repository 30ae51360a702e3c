use tracing::debug;

use crate::error::ClientError;
use crate::ml::ForecastRow;

/// `Idle -> Submitting -> {Success, Failure} -> Idle`. There are no retries:
/// a failed submission needs a fresh `begin`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success(ForecastRow),
    Failure(String),
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Success(_) => "showing a forecast",
            SubmissionState::Failure(_) => "showing an error",
        }
    }
}

#[derive(Debug)]
pub struct Session {
    state: SubmissionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn begin(&mut self) -> Result<(), ClientError> {
        self.transition("submit", |state| match state {
            SubmissionState::Idle => Some(SubmissionState::Submitting),
            _ => None,
        })
    }

    /// Records the outcome of the in-flight submission.
    pub fn complete(&mut self, outcome: Result<ForecastRow, String>) -> Result<(), ClientError> {
        self.transition("complete", move |state| match state {
            SubmissionState::Submitting => Some(match outcome {
                Ok(row) => SubmissionState::Success(row),
                Err(message) => SubmissionState::Failure(message),
            }),
            _ => None,
        })
    }

    /// Clears a shown result so a new submission can start.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        self.transition("reset", |state| match state {
            SubmissionState::Success(_) | SubmissionState::Failure(_) => Some(SubmissionState::Idle),
            _ => None,
        })
    }

    fn transition<F>(&mut self, action: &'static str, next: F) -> Result<(), ClientError>
    where
        F: FnOnce(&SubmissionState) -> Option<SubmissionState>,
    {
        match next(&self.state) {
            Some(state) => {
                debug!("Submission {} -> {}", self.state.name(), state.name());
                self.state = state;
                Ok(())
            }
            None => Err(ClientError::InvalidTransition {
                action,
                state: self.state.name(),
            }),
        }
    }
}
