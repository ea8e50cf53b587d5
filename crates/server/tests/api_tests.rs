//! Integration tests for the HTTP API surface.

mod common;

use axum::http::StatusCode;
use common::server::json_request;
use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/echo/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_metrics_disabled_in_test_config() {
    let server = TestServer::new().await;

    let (status, _) = json_request(&server.router, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_rejects_invalid_json() {
    let server = TestServer::new().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/echo/jobs")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(server.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "invalid_json");
}

#[tokio::test]
async fn test_submit_requires_features_path() {
    let server = TestServer::new().await;

    let (status, body) = server.submit(json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "features_path_missing");
}

#[tokio::test]
async fn test_submit_rejects_missing_features_file() {
    let server = TestServer::new().await;

    let (status, body) = server
        .submit(json!({"features_path": "/definitely/not/there.json"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "features_path_missing");
}

#[tokio::test]
async fn test_submit_returns_202_with_pending_status() {
    let server = TestServer::new().await;
    let features = server.write_features("features.json", &json!({"tempo": 120}));

    let (status, body) = server
        .submit(json!({"features_path": features}))
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    assert!(body["job_id"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let server = TestServer::new().await;

    let uri = format!("/echo/jobs/{}", uuid::Uuid::new_v4());
    let (status, body) = json_request(&server.router, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_malformed_job_id_is_404() {
    let server = TestServer::new().await;

    let (status, body) =
        json_request(&server.router, "GET", "/echo/jobs/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_unknown_index_pointer_is_404() {
    let server = TestServer::new().await;

    let (status, body) =
        json_request(&server.router, "GET", "/echo/index/no-such-track", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_unknown_cas_object_is_404() {
    let server = TestServer::new().await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        "/echo/cfg/src/historical_echo.json",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_traversal_segments_are_404() {
    let server = TestServer::new().await;

    for uri in [
        "/echo/%2E%2E/src/historical_echo.json",
        "/echo/cfg/%2E%2E/historical_echo.json",
        "/echo/cfg/src/%2E%2E",
        "/echo/index/%2E%2E",
    ] {
        let (status, _) = json_request(&server.router, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "expected 404 for {uri}");
    }
}

#[tokio::test]
async fn test_unexpected_filename_is_404() {
    let server = TestServer::new().await;
    let features = server.write_features("features.json", &json!({"tempo": 120}));

    let (_, body) = server.submit(json!({"features_path": features})).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let done = server.wait_for_terminal(&job_id).await;
    assert_eq!(done["status"], "done");

    // Directory exists now, but only the two known filenames are served.
    let artifact_path = done["result"]["artifact_path"].as_str().unwrap();
    let dir = std::path::Path::new(artifact_path).parent().unwrap();
    let source_hash = dir.file_name().unwrap().to_str().unwrap();
    let config_hash = dir.parent().unwrap().file_name().unwrap().to_str().unwrap();

    let uri = format!("/echo/{config_hash}/{source_hash}/other.json");
    let (status, body) = json_request(&server.router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
