use chatrelay_ai::BackendFactory;
use chatrelay_core::BackendSettings;
use std::sync::Arc;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: BackendSettings,
    pub backends: Arc<dyn BackendFactory>,
}

impl AppState {
    pub fn new(settings: BackendSettings, backends: Arc<dyn BackendFactory>) -> Self {
        Self { settings, backends }
    }
}
