//! Typed error hierarchy for vibecode.
//!
//! Two top-level enums cover the two layers:
//! - `LlmError`: one call to the text-generation service failed
//! - `StudioError`: pipeline, storage and API failures

use thiserror::Error;

/// Errors from a single text-generation request.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request timeout after {secs}s: generation took too long")]
    Timeout { secs: u64 },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    HttpStatus { status: u16, body: String },

    #[error("No response from model: reply had no content")]
    EmptyResponse,
}

impl LlmError {
    /// Short cause tag used in logs.
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::HttpStatus { .. } => "http-status",
            Self::EmptyResponse => "empty-response",
        }
    }
}

/// Errors from the studio: generation pipeline, revisions, storage and API.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Expansion failed: {0}")]
    Expansion(#[source] LlmError),

    #[error("Generation failed: {0}")]
    Generation(#[source] LlmError),

    #[error("Post {id} not found")]
    PostNotFound { id: i64 },

    #[error("No artifact for post {post_id}")]
    ArtifactNotFound { post_id: i64 },

    #[error("Post {id} is {status}, expected {expected}")]
    InvalidState {
        id: i64,
        status: String,
        expected: &'static str,
    },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudioError {
    /// The underlying model-call error, if this failure came from one.
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            Self::Expansion(e) | Self::Generation(e) => Some(e),
            _ => None,
        }
    }
}
