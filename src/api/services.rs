use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use super::{
    models::{
        ApplyChangesRequest, ApplyChangesResponse, HealthResponse, JobTriggerResponse,
        StatsResponse,
    },
    state::AppState,
};
use crate::api::error::ApiError;
use crate::applier::{ApplierError, FileChange};
use crate::wal::Operation;

/// Change ingestion endpoint (POST /internal/v1/changes/apply)
///
/// Main entry point for file change batches. Each change is logged to the
/// WAL and pushed to the downstream indexes independently, so the response
/// carries a per-file outcome rather than a single verdict:
///
/// 1. Validate headers (Content-Type, X-Indexwal-User)
/// 2. Read body (gzip handled by middleware), enforce size limit
/// 3. Deserialize and validate the batch shape
/// 4. Apply each change: WAL append, then downstream fan-out
/// 5. Return 200 with per-file outcomes; failed changes come back as
///    `deferred` and are replayed by the recovery job
///
/// The only error responses are validation failures (400/413) and total
/// ingestion failure (500), which means the log itself is unavailable.
pub async fn apply_changes(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    super::utils::require_json_content_type(&headers)?;
    let user_id = super::utils::require_user_header(&headers)?;

    let max_bytes = state.config.server.api.max_batch_bytes.as_u64() as usize;
    let body_bytes = super::utils::read_body(body, max_bytes).await?;

    let request: ApplyChangesRequest = serde_json::from_slice(&body_bytes)?;
    let changes = validate_batch(&state, request)?;

    let outcome = state
        .applier
        .apply_batch(&user_id, &changes)
        .await
        .map_err(|err| match err {
            ApplierError::IngestUnavailable(detail) => ApiError::Internal(detail),
        })?;

    let response = ApplyChangesResponse {
        ok: outcome.counts.rejected == 0,
        per_file: outcome.per_file,
        counts: outcome.counts,
    };

    Ok((axum::http::StatusCode::OK, Json(response)))
}

/// Validates batch shape and converts API items into applier changes
fn validate_batch(
    state: &AppState,
    request: ApplyChangesRequest,
) -> Result<Vec<FileChange>, ApiError> {
    if request.changes.is_empty() {
        return Err(ApiError::InvalidPayload(
            "changes must not be empty".to_string(),
        ));
    }

    let max_changes = state.config.server.api.max_changes_per_batch;
    if request.changes.len() > max_changes {
        return Err(ApiError::InvalidPayload(format!(
            "batch has {} changes, limit is {}",
            request.changes.len(),
            max_changes
        )));
    }

    let mut changes = Vec::with_capacity(request.changes.len());
    for item in request.changes {
        match item.operation {
            Operation::Upsert if item.content.is_none() => {
                return Err(ApiError::InvalidPayload(format!(
                    "upsert for '{}' requires content",
                    item.path
                )));
            }
            Operation::Delete if item.content.is_some() => {
                return Err(ApiError::InvalidPayload(format!(
                    "delete for '{}' must not carry content",
                    item.path
                )));
            }
            _ => {}
        }

        changes.push(FileChange {
            path: item.path,
            operation: item.operation,
            content: item.content,
        });
    }

    Ok(changes)
}

/// WAL statistics endpoint (GET /admin/wal/stats)
pub async fn wal_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let wal = state
        .store
        .stats()
        .map_err(|e| ApiError::Internal(format!("Failed to read stats: {}", e)))?;

    let response = StatsResponse {
        wal,
        counters: state.metrics.snapshot(),
    };

    Ok((axum::http::StatusCode::OK, Json(response)))
}

/// Manual recovery trigger (POST /admin/jobs/recovery)
///
/// Returns `triggered: false` when a run is already in progress.
pub async fn trigger_recovery(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let response = match state.scheduler.trigger_recovery().await {
        None => JobTriggerResponse {
            triggered: false,
            stats: None,
        },
        Some(Ok(stats)) => JobTriggerResponse {
            triggered: true,
            stats: Some(stats),
        },
        Some(Err(err)) => {
            return Err(ApiError::Internal(format!("Recovery run failed: {}", err)));
        }
    };

    Ok((axum::http::StatusCode::OK, Json(response)))
}

/// Manual cleanup trigger (POST /admin/jobs/cleanup)
pub async fn trigger_cleanup(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let response = match state.scheduler.trigger_cleanup().await {
        None => JobTriggerResponse {
            triggered: false,
            stats: None,
        },
        Some(Ok(stats)) => JobTriggerResponse {
            triggered: true,
            stats: Some(stats),
        },
        Some(Err(err)) => {
            return Err(ApiError::Internal(format!("Cleanup run failed: {}", err)));
        }
    };

    Ok((axum::http::StatusCode::OK, Json(response)))
}

/// Health check endpoint (GET /health)
///
/// The WAL component is healthy when the log can be read. Returns 503 if
/// any component is unhealthy, 200 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());
    let wal_status = match state.store.stats() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    components.insert("wal".to_string(), wal_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let overall_status = if all_healthy { "healthy" } else { "unhealthy" };

    let status_code = if all_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
