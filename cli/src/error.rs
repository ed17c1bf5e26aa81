//! Error types shared by the planner, the service client and the speech bridge.

use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("model returned no usable payload")]
    EmptyResponse,

    #[error("model returned a malformed plan: {0}")]
    MalformedPlan(String),

    #[error("service returned an unreadable response body: {0}")]
    UnreadableResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured (set FLOWSTATE_API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("audio playback failed: {0}")]
    PlaybackFailure(String),
}

impl FlowError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Network(_) => true,
            FlowError::Api { status, .. } => *status == 429 || *status >= 500,
            FlowError::EmptyResponse => true,
            FlowError::MalformedPlan(_) => true,
            FlowError::UnreadableResponse(_) => true,
            FlowError::MissingApiKey
            | FlowError::InvalidTask(_)
            | FlowError::InvalidSettings(_)
            | FlowError::PlaybackFailure(_) => false,
        }
    }
}
