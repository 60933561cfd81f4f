//! Backend factory for per-request client creation

use std::sync::Arc;

use crate::error::{AiError, Result};
use crate::llm::{ChatBackend, GeminiClient};

pub trait BackendFactory: Send + Sync {
    fn create_backend(&self, api_key: &str, model: &str) -> Result<Arc<dyn ChatBackend>>;
}

/// Builds [`GeminiClient`]s against a fixed API root.
#[derive(Debug, Clone, Default)]
pub struct GeminiBackendFactory {
    base_url: Option<String>,
}

impl GeminiBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

impl BackendFactory for GeminiBackendFactory {
    fn create_backend(&self, api_key: &str, model: &str) -> Result<Arc<dyn ChatBackend>> {
        if api_key.trim().is_empty() {
            return Err(AiError::Llm("Gemini API key is required".to_string()));
        }

        let mut client = GeminiClient::new(api_key).with_model(model);
        if let Some(base_url) = &self.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Arc::new(client))
    }
}
