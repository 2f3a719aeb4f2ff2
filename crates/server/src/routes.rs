//! HTTP and WebSocket routes.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/ws/chat` | Streaming chat session (WebSocket) |
//! | `POST` | `/chat` | Aggregate answer with ranked sources |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Errors use one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid query: query must not be empty" } }
//! ```

use crate::pipeline::Pipeline;
use crate::protocol::{ChatRequest, ChatResponse};
use crate::session::SessionHandler;
use crate::transport::WsTransport;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sift_core::{AppError, Query};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    sessions: SessionHandler,
}

impl AppState {
    pub fn new(pipeline: Pipeline, pacing: Duration) -> Self {
        Self {
            sessions: SessionHandler::new(pipeline.clone(), pacing),
            pipeline,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/chat", get(handle_ws_chat))
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// HTTP view of an [`AppError`].
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::SearchUnavailable(_)
            | AppError::GenerationFailed(_)
            | AppError::MidStreamGeneration(_)
            | AppError::Llm(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), "Request failed: {}", self.0);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /ws/chat ============

async fn handle_ws_chat(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let mut transport = WsTransport::new(socket);
        let outcome = state.sessions.run(&mut transport).await;
        tracing::debug!(state = ?outcome.state, "WebSocket session finished");
    })
}

// ============ POST /chat ============

async fn handle_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = Query::parse(&body.query)?;
    tracing::debug!(%query, "POST /chat");

    let response = state.pipeline.answer(&query).await?;
    Ok(Json(response))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use crate::testing::{
        next_message, pipeline, read_until_close, send_query, serve, ws_connect, FakeGenerator,
        FakeSearch, UrlOrderRanker,
    };
    use sift_core::Source;

    async fn spawn(state: AppState) -> String {
        format!("http://{}", serve(router(state)).await)
    }

    async fn spawn_ws(state: AppState) -> String {
        format!("ws://{}/ws/chat", serve(router(state)).await)
    }

    fn state(search: FakeSearch, generator: std::sync::Arc<FakeGenerator>) -> AppState {
        AppState::new(pipeline(search, UrlOrderRanker, generator), Duration::ZERO)
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::InvalidQuery("x".into()), StatusCode::BAD_REQUEST),
            (AppError::SearchUnavailable("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::GenerationFailed("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Llm("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(state(FakeSearch::returning(vec![]), FakeGenerator::fragments(&[]))).await;

        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_chat_returns_answer_and_ranked_sources() {
        let search = FakeSearch::returning(vec![
            Source::new("https://b.example", "B", "b"),
            Source::new("https://a.example", "A", "a"),
        ]);
        let base = spawn(state(search, FakeGenerator::fragments(&["Paris", "."]))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({"query": "capital of France"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: ChatResponse = response.json().await.unwrap();
        assert_eq!(body.answer, "Paris.");
        assert_eq!(body.sources[0].url, "https://a.example");
        assert_eq!(body.sources[1].url, "https://b.example");
    }

    #[tokio::test]
    async fn test_chat_blank_query_is_bad_request() {
        let base = spawn(state(FakeSearch::returning(vec![]), FakeGenerator::fragments(&[]))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({"query": "  "}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_chat_missing_query_is_client_error() {
        let base = spawn(state(FakeSearch::returning(vec![]), FakeGenerator::fragments(&[]))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_chat_search_failure_is_bad_gateway() {
        let base = spawn(state(FakeSearch::failing(), FakeGenerator::fragments(&[]))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({"query": "capital of France"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "search_unavailable");
    }

    #[tokio::test]
    async fn test_chat_generation_failure_is_bad_gateway() {
        let search = FakeSearch::returning(vec![Source::new("https://a.example", "A", "a")]);
        let base = spawn(state(search, FakeGenerator::failing_at_start())).await;

        let response = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({"query": "capital of France"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "generation_failed");
    }

    #[tokio::test]
    async fn test_ws_chat_sends_results_then_content_then_close() {
        let search = FakeSearch::returning(vec![
            Source::new("https://b.example", "B", "France is in Europe."),
            Source::new("https://a.example", "A", "Paris is the capital of France."),
        ]);
        let generator = FakeGenerator::fragments(&["Paris", " is the capital", " of France."]);
        let url = spawn_ws(state(search, generator)).await;

        let mut ws = ws_connect(&url).await;
        send_query(&mut ws, "capital of France").await;
        let (messages, closed) = read_until_close(&mut ws).await;

        assert!(closed);
        assert_eq!(messages.len(), 4);
        match &messages[0] {
            ServerMessage::SearchResult(sources) => {
                let urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
                assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
            }
            other => panic!("expected search_result first, got {:?}", other),
        }
        assert_eq!(
            messages[1..],
            [
                ServerMessage::Content("Paris".to_string()),
                ServerMessage::Content(" is the capital".to_string()),
                ServerMessage::Content(" of France.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ws_chat_blank_query_closes_without_messages() {
        let url = spawn_ws(state(FakeSearch::returning(vec![]), FakeGenerator::fragments(&["x"]))).await;

        let mut ws = ws_connect(&url).await;
        send_query(&mut ws, "   ").await;
        let (messages, closed) = read_until_close(&mut ws).await;

        assert!(closed);
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_ws_chat_client_leaving_after_results_keeps_server_up() {
        let search = FakeSearch::returning(vec![Source::new("https://a.example", "A", "a")]);
        let generator = FakeGenerator::fragments(&["Paris", " is", " the", " capital"]);
        let state = AppState::new(
            pipeline(search, UrlOrderRanker, generator),
            Duration::from_millis(50),
        );
        let url = spawn_ws(state).await;

        let mut ws = ws_connect(&url).await;
        send_query(&mut ws, "capital of France").await;
        let first = next_message(&mut ws).await;
        assert!(matches!(first, Some(ServerMessage::SearchResult(_))));
        drop(ws);

        let mut ws = ws_connect(&url).await;
        send_query(&mut ws, "capital of France").await;
        let (messages, closed) = read_until_close(&mut ws).await;
        assert!(closed);
        assert_eq!(messages.len(), 5);
    }
}
