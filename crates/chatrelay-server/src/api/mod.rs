pub mod chat;
pub mod response;
pub mod state;

pub use response::ApiError;
pub use state::AppState;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, header},
    routing::{get, post},
};
use serde::Serialize;
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

#[derive(Serialize)]
struct Health {
    status: &'static str,
    model: String,
    api_key_configured: bool,
}

// GET /health
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        model: state.settings.model().to_string(),
        api_key_configured: state.settings.has_api_key(),
    })
}

/// Build the application router.
///
/// When `static_dir` is given, unmatched paths are served from it.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chatrelay_ai::GeminiBackendFactory;
    use chatrelay_core::BackendSettings;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(api_key: Option<&str>) -> AppState {
        AppState::new(
            BackendSettings::new(api_key.map(str::to_string), "gemini-pro"),
            Arc::new(GeminiBackendFactory::new()),
        )
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_model_and_key_presence() {
        let (status, body) = get_body(router(state(None), None), "/health").await;

        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "ok", "model": "gemini-pro", "api_key_configured": false})
        );
    }

    #[tokio::test]
    async fn chat_route_rejects_get() {
        let response = router(state(Some("key")), None)
            .oneshot(
                Request::builder()
                    .uri("/api/chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn serves_static_directory_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();

        let (status, body) = get_body(router(state(None), Some(dir.path())), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>chat</h1>");

        let (status, _) = get_body(router(state(None), None), "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
