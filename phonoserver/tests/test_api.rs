//! Route-level tests over the axum router with an in-memory store.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use phonoplayer::{PlaybackController, PlayerConfig};
use phonostore::MemoryStore;

fn test_router() -> (Router, tempfile::TempDir) {
    let download_dir = tempfile::tempdir().unwrap();
    let config = PlayerConfig {
        download_dir: download_dir.path().to_path_buf(),
        download_timeout: Duration::from_secs(2),
        terminate_grace: Duration::from_secs(1),
        cleanup_delay: Duration::from_millis(50),
        ..PlayerConfig::default()
    };
    let controller = PlaybackController::new(config, Arc::new(MemoryStore::new())).unwrap();
    (phonoserver::api::router(controller), download_dir)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (router, _dir) = test_router();
    let (status, body) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "phono");
}

#[tokio::test]
async fn test_stop_idle_is_success() {
    let (router, _dir) = test_router();
    let (status, body) = get_json(&router, "/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["playing"], false);
}

#[tokio::test]
async fn test_pause_without_session_reports_domain_failure() {
    let (router, _dir) = test_router();
    let (status, body) = get_json(&router, "/pause").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], false);
    assert!(body["message"].as_str().unwrap().contains("Nothing"));
}

#[tokio::test]
async fn test_resume_without_session_reports_domain_failure() {
    let (router, _dir) = test_router();
    let (_, body) = get_json(&router, "/resume").await;
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_seek_without_session_reports_domain_failure() {
    let (router, _dir) = test_router();
    let (_, body) = get_json(&router, "/seek?position=42.5").await;
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_seek_requires_position_param() {
    let (router, _dir) = test_router();
    let response = router
        .clone()
        .oneshot(Request::builder().uri("/seek").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_when_idle() {
    let (router, _dir) = test_router();
    let (status, body) = get_json(&router, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playing"], false);
    assert_eq!(body["paused"], false);
    assert_eq!(body["trackToken"], Value::Null);
    assert_eq!(body["song"], Value::Null);
}

#[tokio::test]
async fn test_play_acknowledges_and_failure_clears_session() {
    let (router, _dir) = test_router();

    // Nothing listens on this port; the download will fail in the
    // background after the acknowledgement.
    let (status, body) = get_json(
        &router,
        "/play?url=http://127.0.0.1:1/a.mp3&trackToken=t1&name=Song&artists=Band",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["trackToken"], "t1");

    // The failed session eventually clears
    for _ in 0..100 {
        let (_, body) = get_json(&router, "/status").await;
        if body["trackToken"] == Value::Null {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("session was not cleared after download failure");
}

#[tokio::test]
async fn test_play_accepts_legacy_uuid_param() {
    let (router, _dir) = test_router();
    let (_, body) = get_json(&router, "/play?url=http://127.0.0.1:1/a.mp3&uuid=legacy").await;
    assert_eq!(body["trackToken"], "legacy");
}

#[test]
fn test_openapi_document_lists_all_operations() {
    use utoipa::OpenApi;
    let doc = phonoserver::ApiDoc::openapi();
    let json = serde_json::to_value(&doc).unwrap();
    for path in ["/play", "/stop", "/pause", "/resume", "/seek", "/status", "/health"] {
        assert!(
            json["paths"].get(path).is_some(),
            "missing path {path} in OpenAPI document"
        );
    }
}
