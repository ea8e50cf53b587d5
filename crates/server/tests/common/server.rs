//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use echo_core::AppConfig;
use echo_runner::adapter::EchoRunner;
use echo_runner::probe::PassthroughProbe;
use echo_runner::Runner;
use echo_server::{AppState, create_router};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with a temporary CAS root.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub cas_root: PathBuf,
    temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server backed by the passthrough probe.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config = AppConfig::for_testing(temp_dir.path().join("cas"));
        let runner = Arc::new(EchoRunner::new(
            Arc::new(PassthroughProbe),
            config.runner.clone(),
            config.cas.artifact_name.clone(),
            config.cas.manifest_name.clone(),
        ));
        Self::build(temp_dir, config, runner)
    }

    /// Create a test server with a caller-supplied runner.
    pub async fn with_runner(runner: Arc<dyn Runner>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config = AppConfig::for_testing(temp_dir.path().join("cas"));
        Self::build(temp_dir, config, runner)
    }

    fn build(temp_dir: TempDir, config: AppConfig, runner: Arc<dyn Runner>) -> Self {
        let cas_root = config.cas.root.clone();
        std::fs::create_dir_all(&cas_root).expect("Failed to create CAS root");
        let state = AppState::new(config, runner);
        let router = create_router(state.clone());
        Self {
            router,
            state,
            cas_root,
            temp_dir,
        }
    }

    /// Write a features file into the test sandbox and return its path.
    pub fn write_features(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, serde_json::to_vec(value).unwrap())
            .expect("Failed to write features file");
        path
    }

    /// Submit a job body and return (status, response body).
    pub async fn submit(&self, body: Value) -> (StatusCode, Value) {
        json_request(&self.router, "POST", "/echo/jobs", Some(body)).await
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let (status, body) =
                json_request(&self.router, "GET", &format!("/echo/jobs/{job_id}"), None).await;
            assert_eq!(status, StatusCode::OK, "job lookup failed: {body}");
            if body["status"] == "done" || body["status"] == "error" {
                return body;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {job_id} did not finish in time: {body}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// GET a URI with extra headers, returning the full response parts.
#[allow(dead_code)]
pub async fn get_raw(
    router: &axum::Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let response_headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, response_headers, body)
}
