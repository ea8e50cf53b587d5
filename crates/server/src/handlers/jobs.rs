//! Job submission and status endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use echo_core::{JobParams, JobRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SubmitRequest {
    pub features_path: Option<PathBuf>,
    pub track_id: Option<String>,
    pub run_id: Option<String>,
    pub config_hash: Option<String>,
    pub db_path: Option<PathBuf>,
    pub db_hash: Option<String>,
    /// Opaque probe options, forwarded untouched.
    #[serde(alias = "probe_kwargs")]
    pub probe: Map<String, Value>,
    pub runner_kwargs: Map<String, Value>,
}

/// POST /echo/jobs
///
/// Registers the job and returns 202 immediately; the artifact is
/// computed by the background worker.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request: SubmitRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    let features_path = match request.features_path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(ApiError::FeaturesPathMissing("(absent)".to_string())),
    };
    let is_file = tokio::fs::metadata(&features_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::FeaturesPathMissing(
            features_path.display().to_string(),
        ));
    }

    let params = JobParams {
        features_path,
        out_root: state.config.cas.root.clone(),
        track_id: request.track_id,
        run_id: request.run_id,
        config_hash: request.config_hash,
        db_path: request.db_path.or_else(|| state.config.runner.db_path.clone()),
        db_hash: request.db_hash,
        probe_kwargs: request.probe,
        runner_kwargs: request.runner_kwargs,
    };

    let job_id = state.queue.submit(params).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"job_id": job_id, "status": "pending"})),
    ))
}

#[derive(Debug, Serialize)]
pub struct JobStatusBody {
    pub job_id: Uuid,
    #[serde(flatten)]
    pub record: JobRecord,
}

/// GET /echo/jobs/{job_id}
///
/// Malformed ids are indistinguishable from unknown ones.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusBody>> {
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| ApiError::NotFound(format!("no such job: {job_id}")))?;
    let record = state
        .queue
        .get(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no such job: {job_id}")))?;
    Ok(Json(JobStatusBody { job_id, record }))
}
