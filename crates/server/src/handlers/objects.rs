//! CAS object and index pointer delivery.
//!
//! Artifacts are immutable by construction, so they are served with an
//! aggressive cache policy and a strong ETag. Every artifact read is
//! re-validated against its manifest; a mismatch is surfaced as a
//! server error, never as stale bytes.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use echo_core::{cas_path, is_safe_segment, is_safe_track_id};
use echo_store::{read_pointer, validate};
use serde_json::Value;
use tokio::fs;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const POINTER_CACHE: &str = "max-age=60";

/// GET /echo/index/{track_id}
///
/// The pointer is mutable, so it gets a short client cache window.
pub async fn get_index_pointer(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
) -> ApiResult<Response> {
    if !is_safe_track_id(&track_id) {
        return Err(ApiError::NotFound(format!("no pointer for: {track_id}")));
    }
    let pointer: Value = read_pointer(state.cas_root(), &track_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no pointer for: {track_id}")))?;

    Ok((
        [(header::CACHE_CONTROL, POINTER_CACHE)],
        Json(pointer),
    )
        .into_response())
}

/// GET /echo/{config_hash}/{source_hash}/{filename}
pub async fn get_cas_object(
    State(state): State<AppState>,
    Path((config_hash, source_hash, filename)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    for segment in [&config_hash, &source_hash, &filename] {
        if !is_safe_segment(segment) {
            return Err(ApiError::NotFound("no such object".to_string()));
        }
    }

    let path = cas_path(state.cas_root(), &config_hash, &source_hash, &filename);

    if filename == state.config.cas.artifact_name {
        let manifest_path = cas_path(
            state.cas_root(),
            &config_hash,
            &source_hash,
            &state.config.cas.manifest_name,
        );
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ApiError::NotFound("no such object".to_string()));
        }

        let outcome = validate(&path, &manifest_path).await;
        let ok = outcome.ok;
        let Some(etag) = outcome.etag.filter(|_| ok) else {
            tracing::error!(
                config_hash = %config_hash,
                source_hash = %source_hash,
                "stored artifact failed validation"
            );
            return Err(ApiError::HashMismatch(format!(
                "{config_hash}/{source_hash}/{filename}"
            )));
        };

        if if_none_match_hit(&headers, &etag) {
            return Ok((
                StatusCode::NOT_MODIFIED,
                [
                    (header::ETAG, etag),
                    (header::CACHE_CONTROL, IMMUTABLE_CACHE.to_string()),
                ],
            )
                .into_response());
        }

        let body = fs::read(&path).await.map_err(|e| {
            ApiError::Internal(format!("artifact read failed: {e}"))
        })?;
        metrics::ARTIFACT_BYTES_SERVED.inc_by(body.len() as u64);
        return Ok((
            [
                (header::ETAG, etag),
                (header::CACHE_CONTROL, IMMUTABLE_CACHE.to_string()),
                (header::CONTENT_TYPE, "application/json".to_string()),
            ],
            body,
        )
            .into_response());
    }

    if filename == state.config.cas.manifest_name {
        let body = fs::read(&path)
            .await
            .map_err(|_| ApiError::NotFound("no such object".to_string()))?;
        return Ok((
            [
                (header::CACHE_CONTROL, IMMUTABLE_CACHE.to_string()),
                (header::CONTENT_TYPE, "application/json".to_string()),
            ],
            body,
        )
            .into_response());
    }

    Err(ApiError::NotFound("no such object".to_string()))
}

/// Strong comparison against If-None-Match, tolerating quoted tags.
fn if_none_match_hit(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    value
        .split(',')
        .map(|tag| tag.trim().trim_matches('"'))
        .any(|tag| tag == etag || tag == "*")
}
