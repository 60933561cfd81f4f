//! Backend credential and model selection

use std::sync::Arc;

use chatrelay_ai::{BackendFactory, ChatBackend};

use crate::error::{RelayError, Result};

pub const MISSING_API_KEY: &str = "GEMINI_API_KEY is not set. Create an API key in Google AI Studio and set the env var before running.";

/// Credential and model handed to the bridge for each request.
#[derive(Clone)]
pub struct BackendSettings {
    api_key: Option<String>,
    model: String,
}

impl BackendSettings {
    /// Blank keys count as absent.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build a backend for one request, failing when no credential is configured.
    pub fn backend(&self, factory: &dyn BackendFactory) -> Result<Arc<dyn ChatBackend>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::Configuration(MISSING_API_KEY.to_string()))?;

        factory
            .create_backend(api_key, &self.model)
            .map_err(|e| RelayError::Configuration(e.to_string()))
    }
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}
