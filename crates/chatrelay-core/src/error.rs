//! Relay error taxonomy

use chatrelay_ai::AiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Backend credential or settings missing; fatal to the request only.
    #[error("{0}")]
    Configuration(String),

    /// Payload or conversation cannot be sent to the backend.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] AiError),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status used when the error is reported before streaming starts.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) => 500,
            Self::Validation(_) => 400,
            Self::Backend(_) => 502,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
