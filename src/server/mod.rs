//! HTTP chat endpoint.
//!
//! `POST /chat` takes `{"prompt": "..."}` and answers with a streaming
//! NDJSON body of token frames. Input problems and failures to start
//! generation are answered up front with a JSON error record of the same
//! shape as an error frame, and no stream. `GET /health` is a liveness probe.

pub mod encoder;
pub mod pacing;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::GlobalConfig;
use crate::generator::Generator;
use crate::protocol::Frame;
use crate::{AppError, Result};

/// Body of the `400` answer to a missing or blank prompt.
pub const PROMPT_NOT_FOUND_MESSAGE: &str = "prompt not found";

/// Body of the `400` answer to a body that is not JSON.
pub const INVALID_BODY_MESSAGE: &str = "invalid request body";

/// Body of the `413` answer to an oversized prompt.
pub const PROMPT_TOO_LONG_MESSAGE: &str = "prompt too long";

/// Body of the `500` answer when generation cannot start.
pub const GENERATION_FAILED_MESSAGE: &str =
    "failed to generate answer, check server logs for more details...";

/// Content type of streaming responses.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Shared state for request handlers.
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// Backend producing answers.
    pub generator: Arc<dyn Generator>,
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `server.host:server.http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the address cannot be bound and
/// `AppError::Transport` if the server fails.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = state.config.server.bind_addr()?;
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;
    serve_listener(listener, state, ct).await
}

/// Serve on an already bound `listener` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Transport` if the server fails.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("listener has no local address: {err}")))?;
    info!(%addr, "starting chat HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Transport(format!("HTTP server error: {err}")))?;

    info!("chat HTTP server shut down");
    Ok(())
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `POST /chat`.
async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("chat", %request_id);

    async move {
        let prompt = match extract_prompt(&body, state.config.server.max_prompt_bytes) {
            Ok(prompt) => prompt,
            Err((status, message)) => {
                warn!(%status, reason = message, "rejected chat request");
                return error_response(status, message);
            }
        };

        info!(prompt_bytes = prompt.len(), "chat request accepted");

        let increments = match state.generator.generate(prompt).await {
            Ok(increments) => increments,
            Err(err) => {
                error!(%err, "failed to start generation");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED_MESSAGE);
            }
        };

        let server = &state.config.server;
        let paced = pacing::pace(increments, server.chunking, server.frame_delay());
        let frames = encoder::encode_frames(paced);
        let body = Body::from_stream(encoder::frame_body(frames));

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response()
    }
    .instrument(span)
    .await
}

/// Pull a non-blank prompt out of a request body.
fn extract_prompt(
    body: &[u8],
    max_prompt_bytes: usize,
) -> std::result::Result<String, (StatusCode, &'static str)> {
    let request: Value = serde_json::from_slice(body)
        .map_err(|_| (StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE))?;

    let prompt = request
        .get("prompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, PROMPT_NOT_FOUND_MESSAGE))?;

    if prompt.len() > max_prompt_bytes {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, PROMPT_TOO_LONG_MESSAGE));
    }

    Ok(prompt.to_owned())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(Frame::error(message))).into_response()
}
