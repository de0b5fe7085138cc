use streaming::FetchExhausted;
use thiserror::Error;

/// Conditions that end an activation session in [`crate::LoadState::Error`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActivationError {
    #[error("scene container {selector} not found in document")]
    ContainerMissing { selector: String },

    #[error("model could not be fetched: {0}")]
    FetchExhausted(#[from] FetchExhausted),

    #[error("renderer failed to start: {0}")]
    RenderBootstrapFailure(String),
}

impl ActivationError {
    /// Whether a manual retry can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ActivationError::ContainerMissing { .. })
    }
}

/// `retry()` outside the error state, or after an error no retry can fix.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("retry not possible in state {state:?}")]
pub struct RetryRejected {
    pub state: crate::state::LoadState,
}
