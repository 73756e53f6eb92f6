//! Dashboard HTTP API tests, driven through the router without a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use omifi_core::capability::ClipKind;
use omifi_core::dashboard::{router, DashboardState};
use omifi_core::storage::Storage;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct Fixture {
    state: DashboardState,
    storage: Arc<Storage>,
    commands_rx: mpsc::UnboundedReceiver<String>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(Storage::new(dir.path().join("omifi")).unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    Fixture {
        state: DashboardState {
            storage: storage.clone(),
            commands: tx,
            session_state: None,
            speech_available: false,
        },
        storage,
        commands_rx: rx,
        _dir: dir,
    }
}

async fn get_json(state: DashboardState, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_command(state: DashboardState, body: &str) -> (StatusCode, serde_json::Value) {
    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/command")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_on_fresh_store() {
    let fx = fixture();
    let (status, json) = get_json(fx.state, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "running");
    assert_eq!(json["screenshots"], 0);
    assert_eq!(json["clipboard"], 0);
    assert_eq!(json["session_state"], serde_json::Value::Null);
    assert_eq!(json["speech_available"], false);
}

#[tokio::test]
async fn test_screenshots_listing() {
    let fx = fixture();
    fx.storage.save_screenshot(b"png-bytes").unwrap();
    let (status, json) = get_json(fx.state, "/screenshots").await;
    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0]["filename"]
        .as_str()
        .unwrap()
        .starts_with("screenshot_"));
}

#[tokio::test]
async fn test_clipboard_latest() {
    let fx = fixture();
    let (status, json) = get_json(fx.state.clone(), "/clipboard/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], serde_json::Value::Null);

    fx.storage
        .save_clipboard_content("hello from the clipboard", ClipKind::Text)
        .unwrap();
    let (status, json) = get_json(fx.state, "/clipboard/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "hello from the clipboard");
}

#[tokio::test]
async fn test_clipboard_listing_reports_kind() {
    let fx = fixture();
    fx.storage
        .save_clipboard_content("https://example.com", ClipKind::Url)
        .unwrap();
    let (_, json) = get_json(fx.state, "/clipboard").await;
    assert_eq!(json[0]["kind"], "url");
}

#[tokio::test]
async fn test_post_command_enqueues() {
    let mut fx = fixture();
    let (status, json) = post_command(fx.state, r#"{"text": "take a screenshot"}"#).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "queued");
    assert_eq!(fx.commands_rx.recv().await.unwrap(), "take a screenshot");
}

#[tokio::test]
async fn test_post_empty_command_rejected() {
    let mut fx = fixture();
    let (status, _) = post_command(fx.state, r#"{"text": "   "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(fx.commands_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_post_command_after_queue_closed() {
    let fx = fixture();
    drop(fx.commands_rx);
    let (status, _) = post_command(fx.state, r#"{"text": "help"}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
