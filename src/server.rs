//! HTTP answer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/answer` | Answer a question, with or without retrieval |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

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
use tracing::{info, warn};

use crate::answer::{AnswerMode, Answerer};
use crate::config::Config;
use crate::models::HitSummary;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    answerer: Arc<Answerer>,
}

/// Starts the HTTP server with providers built from `config`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let answerer = Arc::new(Answerer::from_config(config)?);
    serve(&config.server.bind, answerer).await
}

/// Serve `answerer` on `bind_addr`.
pub async fn serve(bind_addr: &str, answerer: Arc<Answerer>) -> anyhow::Result<()> {
    let app = router(answerer);

    println!("answer server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(answerer: Arc<Answerer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/answer", post(handle_answer))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { answerer })
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Embedding, chat, or index failure while answering.
fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
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

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
    #[serde(default = "default_use_rag")]
    use_rag: bool,
}

fn default_use_rag() -> bool {
    true
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    hits: Vec<HitSummary>,
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let mode = AnswerMode::from_use_rag(req.use_rag);
    info!("POST /answer ({:?})", mode);

    let answer = state
        .answerer
        .answer(&req.question, mode)
        .await
        .map_err(|e| {
            warn!("answer failed: {:#}", e);
            upstream_error(format!("{:#}", e))
        })?;

    Ok(Json(AnswerResponse {
        hits: answer.hit_summaries(),
        answer: answer.text,
    }))
}
