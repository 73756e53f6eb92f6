//! Web dashboard: a small JSON API over the assistant's state and
//! artifact store. Commands posted here go through the same queue as
//! voice commands, so ordering guarantees hold across both paths.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::error::Result;
use crate::storage::{ArtifactRecord, Storage};
use crate::voice::SessionState;

const RECENT_LIMIT: usize = 50;

/// Shared handler state. Cloning is cheap; everything inside is a handle.
#[derive(Clone)]
pub struct DashboardState {
    pub storage: Arc<Storage>,
    pub commands: mpsc::UnboundedSender<String>,
    pub session_state: Option<watch::Receiver<SessionState>>,
    pub speech_available: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    session_state: Option<SessionState>,
    speech_available: bool,
    screenshots: usize,
    clipboard: usize,
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct ClipboardLatest {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/screenshots", get(screenshots))
        .route("/clipboard", get(clipboard))
        .route("/clipboard/latest", get(clipboard_latest))
        .route("/command", post(submit_command))
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: DashboardState, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        session_state: state.session_state.as_ref().map(|rx| *rx.borrow()),
        speech_available: state.speech_available,
        screenshots: state.storage.recent_screenshots(usize::MAX).len(),
        clipboard: state.storage.recent_clipboard(usize::MAX).len(),
    })
}

async fn screenshots(State(state): State<DashboardState>) -> Json<Vec<ArtifactRecord>> {
    Json(state.storage.recent_screenshots(RECENT_LIMIT))
}

async fn clipboard(State(state): State<DashboardState>) -> Json<Vec<ArtifactRecord>> {
    Json(state.storage.recent_clipboard(RECENT_LIMIT))
}

async fn clipboard_latest(
    State(state): State<DashboardState>,
) -> std::result::Result<Json<ClipboardLatest>, (StatusCode, Json<ErrorBody>)> {
    match state.storage.get_last_clipboard_content() {
        Ok(content) => Ok(Json(ClipboardLatest { content })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )),
    }
}

async fn submit_command(
    State(state): State<DashboardState>,
    Json(request): Json<CommandRequest>,
) -> std::result::Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<ErrorBody>)> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "command text must not be empty".to_string(),
            }),
        ));
    }
    if state.commands.send(text.to_string()).is_err() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "command queue is closed".to_string(),
            }),
        ));
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "queued", "text": text })),
    ))
}
