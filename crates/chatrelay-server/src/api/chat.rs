use crate::api::{ApiError, state::AppState};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chatrelay_core::{bridge, normalize};
use futures::StreamExt;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// POST /api/chat
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();

    let backend = state
        .settings
        .backend(state.backends.as_ref())
        .inspect_err(|e| warn!(%request_id, error = %e, "Backend not configured"))?;

    // Unparseable bodies are treated as an empty payload.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let conversation = normalize(&payload)
        .inspect_err(|e| info!(%request_id, error = %e, "Rejected chat payload"))?;

    info!(
        %request_id,
        utterances = conversation.len(),
        model = backend.model(),
        "Streaming chat reply"
    );

    let lines = bridge::stream(backend, conversation).map(|frame| frame.to_ndjson_line());

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(lines),
    )
        .into_response())
}
