//! Axum-based HTTP gateway: entry point for the Saathi backend relay.
//! Config-driven via CoreConfig; chat is wired through handlers::chat so the
//! LLM always receives the persona instruction composed from stored
//! preferences. API keys stay in the backend only.

mod handlers;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::Path as StdPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saathi_core::{
    CompletionService, CoreConfig, CoreError, LlmMode, PreferenceRecord, PreferenceStore,
};

/// Incoming chat request. `mode` is an open string; anything other than
/// `"personal"` selects the tutoring persona.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    pub(crate) mode: String,
    pub(crate) message: String,
    pub(crate) user_id: String,
}

/// Shared handles constructed once at startup and cloned into handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) store: Arc<PreferenceStore>,
    pub(crate) completions: Arc<CompletionService>,
}

/// Uniform server-error response: every relay failure becomes a 500 with a
/// `detail` message, after the full error is logged.
pub(crate) struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(target: "saathi::gateway", error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// GET / - root descriptor.
async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Backend is live!" }))
}

/// GET /health - liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// GET /memory/:user_id - stored preferences, or a synthesized empty default
/// for a user that has never written one.
async fn get_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PreferenceRecord>, ApiError> {
    let record = state.store.get(&user_id)?;
    Ok(Json(record))
}

/// POST /memory - whole-document upsert of one user's preferences.
async fn update_memory(
    State(state): State<AppState>,
    Json(record): Json<PreferenceRecord>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.upsert(&record)?;
    tracing::info!(target: "saathi::gateway", user_id = %record.user_id, "preferences updated");
    Ok(Json(json!({ "status": "success" })))
}

/// POST /chat - relay one chat request: preferences -> instruction -> LLM.
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let correlation_id = uuid::Uuid::new_v4();
    tracing::info!(
        target: "saathi::gateway",
        %correlation_id,
        mode = %req.mode,
        user_id = %req.user_id,
        message_chars = req.message.len(),
        "chat request received"
    );
    let reply = handlers::chat::relay_chat(&state, &req).await?;
    tracing::info!(
        target: "saathi::gateway",
        %correlation_id,
        reply_chars = reply.len(),
        "chat reply generated"
    );
    Ok(Json(json!({ "response": reply })))
}

/// GET /chat - advisory for clients that probe the chat path with GET.
async fn chat_get_advisory() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "detail": "GET is not supported on /chat; POST a JSON body with mode, message, and user_id"
        })),
    )
}

/// CORS policy from the configured allow-list. `["*"]` (or an empty list
/// resolving to it) allows any origin; otherwise only the listed origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/memory/:user_id", get(get_memory))
        .route("/memory", post(update_memory))
        .route("/chat", post(chat).get(chat_get_advisory))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load .env first: the LLM key lives in the backend environment only and
    // must never reach a frontend client.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[saathi-gateway] .env not loaded: {e} (using system environment)");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(CoreConfig::load().expect("load gateway config"));
    let llm_mode = LlmMode::from_mode_str(&config.llm_mode);

    if llm_mode == LlmMode::Live
        && std::env::var("SAATHI_LLM_API_KEY").is_err()
        && std::env::var("OPENROUTER_API_KEY").is_err()
    {
        eprintln!(
            "[saathi-gateway] Hint: llm_mode is \"live\" but neither SAATHI_LLM_API_KEY nor \
             OPENROUTER_API_KEY is set; /chat will fail until one is provided."
        );
    }

    let storage = StdPath::new(&config.storage_path);
    let store = Arc::new(
        PreferenceStore::open_path(storage.join("saathi_prefs"))
            .expect("open preference store"),
    );
    let completions = Arc::new(CompletionService::new(llm_mode));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        store: Arc::clone(&store),
        completions,
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(target: "saathi::gateway", "{} listening on {} (llm_mode: {})", config.app_name, addr, config.llm_mode);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind gateway port");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(target: "saathi::gateway", "server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "saathi::gateway", "shutdown requested; flushing preference store");
            if let Err(e) = store.flush() {
                tracing::warn!(target: "saathi::gateway", "preference store flush failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config() -> CoreConfig {
        CoreConfig {
            app_name: "Test Gateway".to_string(),
            port: 8000,
            storage_path: "./data".to_string(),
            llm_mode: "mock".to_string(),
            allowed_origins: vec!["*".to_string()],
        }
    }

    fn test_state(dir: &tempfile::TempDir, completions: CompletionService) -> AppState {
        AppState {
            config: Arc::new(test_config()),
            store: Arc::new(PreferenceStore::open_path(dir.path().join("prefs")).unwrap()),
            completions: Arc::new(completions),
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_reports_live() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));
        let res = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "message": "Backend is live!" }));
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));
        let res = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn memory_get_unknown_user_returns_synthesized_default() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));
        let res = app.oneshot(get_request("/memory/unknown_user")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "user_id": "unknown_user", "favorites": {}, "mood": null })
        );
    }

    #[tokio::test]
    async fn memory_upsert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));

        let record = json!({
            "user_id": "u1",
            "favorites": { "color": "blue" },
            "mood": "happy"
        });
        let res = app
            .clone()
            .oneshot(post_json("/memory", record.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "status": "success" }));

        let res = app.oneshot(get_request("/memory/u1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, record);
    }

    #[tokio::test]
    async fn memory_second_upsert_replaces_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));

        let first = json!({ "user_id": "u1", "favorites": { "color": "blue" }, "mood": "happy" });
        let second = json!({ "user_id": "u1", "favorites": { "food": "dosa" } });
        app.clone().oneshot(post_json("/memory", first)).await.unwrap();
        app.clone().oneshot(post_json("/memory", second)).await.unwrap();

        let res = app.oneshot(get_request("/memory/u1")).await.unwrap();
        assert_eq!(
            body_json(res).await,
            json!({ "user_id": "u1", "favorites": { "food": "dosa" }, "mood": null })
        );
    }

    #[tokio::test]
    async fn chat_returns_generated_reply() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));

        let res = app
            .oneshot(post_json(
                "/chat",
                json!({ "mode": "academy", "message": "Explain photosynthesis", "user_id": "u2" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "response": "[Generated - Mock LLM] Explain photosynthesis" })
        );
    }

    #[tokio::test]
    async fn chat_surfaces_generation_failure_as_server_error() {
        // Bind then drop a listener so the completion endpoint is closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let completions = CompletionService::new(LlmMode::Live)
            .with_api_url(&format!("http://127.0.0.1:{port}/v1/chat/completions"))
            .with_api_key("test-key");
        let app = build_app(test_state(&dir, completions));

        let res = app
            .oneshot(post_json(
                "/chat",
                json!({ "mode": "academy", "message": "hello", "user_id": "u3" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("generation failed"));
    }

    #[tokio::test]
    async fn chat_get_returns_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));
        let res = app.oneshot(get_request("/chat")).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(res).await;
        assert!(body["detail"].as_str().unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn malformed_chat_body_is_rejected_before_the_relay() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(&dir, CompletionService::new(LlmMode::Mock)));
        let res = app
            .oneshot(post_json("/chat", json!({ "message": "missing fields" })))
            .await
            .unwrap();
        assert!(res.status().is_client_error());
    }
}
