//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a model endpoint call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Short label for the failure kind, used in logs and transcripts
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::ApiError { .. } => "api",
            LlmError::Network(_) => "network",
            LlmError::InvalidResponse(_) => "invalid-response",
            LlmError::Timeout(_) => "timeout",
            LlmError::Json(_) => "json",
        }
    }

    /// Check if the same call could plausibly succeed later
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
        }
    }
}
