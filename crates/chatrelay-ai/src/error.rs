//! Error types for the backend module

use thiserror::Error;

/// Backend error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error (HTTP {status}): {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid UTF-8 in stream: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, AiError>;
