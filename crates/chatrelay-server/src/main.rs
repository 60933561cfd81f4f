#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;

use anyhow::Context;
use api::AppState;
use chatrelay_ai::GeminiBackendFactory;
use chatrelay_core::BackendSettings;
use config::ServerConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatrelay_server=debug,chatrelay_core=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting ChatRelay server");

    let config = ServerConfig::load()?;
    tracing::debug!(?config, "Loaded configuration");

    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail until it is configured");
    }

    let settings = BackendSettings::new(config.gemini.api_key.clone(), config.gemini.model.clone());
    let backends = GeminiBackendFactory::new().with_base_url(config.gemini.base_url.clone());
    let state = AppState::new(settings, Arc::new(backends));

    let static_dir = config
        .static_dir
        .as_deref()
        .filter(|dir| dir.is_dir());
    if let Some(dir) = &config.static_dir
        && !dir.is_dir()
    {
        tracing::warn!(path = %dir.display(), "Static directory not found; skipping");
    }

    let app = api::router(state, static_dir);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;

    tracing::info!("ChatRelay running on http://{address}");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
