/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! HTTP API
//!
//! Routes:
//! - `POST /generate` — admit a synthesis task, returns 201 with the task id.
//! - `DELETE /tasks/{task_id}/cancel` — idempotent cancellation of a pending
//!   task; 200 whether or not the task was still queued.
//! - `GET /healthz` — liveness.
//! - `GET /stats` — queue depths.
//! - `GET /metrics` — Prometheus exposition.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use cantus::error::SubmitError;
use cantus::gateway::{SubmissionGateway, SubmissionRequest};
use cantus::queue::{ProcessQueue, UploadQueue};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SubmissionGateway>,
    pub process_queue: Arc<ProcessQueue>,
    pub upload_queue: Arc<UploadQueue>,
    pub metrics: Option<PrometheusHandle>,
}

/// Assembles the API router over the shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/tasks/{task_id}/cancel", delete(cancel))
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// JSON error body with the HTTP status it renders as.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Admission(e) => ApiError::bad_request(e.to_string()),
            SubmitError::Queue(e) => {
                error!("Queue failure during submission: {}", e);
                ApiError::internal()
            }
        }
    }
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<SubmissionRequest>,
) -> Result<Response, ApiError> {
    let admitted = state.gateway.submit(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "task_uuid": admitted.task_uuid,
            "status": "queued",
            "message": "Task added to queue successfully",
        })),
    )
        .into_response())
}

async fn cancel(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    // Cancellation is idempotent: an identifier that never names a pending
    // task (unknown, already claimed, or not a UUID at all) is a no-op.
    if let Ok(id) = Uuid::parse_str(&task_id) {
        state.gateway.cancel(id).await?;
    }

    Ok(Json(json!({
        "task_uuid": task_id,
        "status": "canceled",
        "message": "Task canceled successfully",
    }))
    .into_response())
}

async fn healthz() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    let process_queued = state.process_queue.depth().await.map_err(|e| {
        error!("Failed to read process queue depth: {}", e);
        ApiError::internal()
    })?;
    let upload_queued = state.upload_queue.depth().await.map_err(|e| {
        error!("Failed to read upload queue depth: {}", e);
        ApiError::internal()
    })?;

    Ok(Json(json!({
        "process_queued": process_queued,
        "upload_queued": upload_queued,
        "timestamp": Utc::now().timestamp(),
    }))
    .into_response())
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled").into_response(),
    }
}
