//! HTTP API for the question-answering pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/chat` | Answer `{ "query": ... }` with `{ "response": ... }` |
//!
//! # Error Contract
//!
//! Any pipeline failure maps to `500` with a message-only body:
//!
//! ```json
//! { "detail": "collection not found: cars" }
//! ```
//!
//! A request body that is not valid JSON or lacks `query` is rejected by the
//! JSON extractor before reaching the pipeline.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser frontend on
//! another port can call the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::{Config, Credentials};
use crate::embedding::create_provider;
use crate::error::RagError;
use crate::rag::RagPipeline;
use crate::sqlite_store::SqliteStore;

/// Open the index, build the pipeline, and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let index = Arc::new(SqliteStore::open(&config.index.path).await?);
    let embedder = create_provider(&config.embedding, &Credentials::from_env())?;
    let pipeline = Arc::new(RagPipeline::from_config(config, index, embedder));

    let app = router(pipeline);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server listening");
    println!("Car Benchmarking API listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router around a ready pipeline.
pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/chat", post(handle_chat))
        .layer(cors)
        .with_state(pipeline)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

struct AppError(RagError);

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "chat request failed");
        let body = ErrorBody {
            detail: self.0.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Car Benchmarking API is running",
    })
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

// ============ POST /api/chat ============

/// `history` is accepted for client compatibility; answers do not depend on it.
/// It may be omitted or `null`.
#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    #[allow(dead_code)]
    history: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn handle_chat(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = pipeline.answer(&req.query).await?;
    Ok(Json(ChatResponse { response }))
}
