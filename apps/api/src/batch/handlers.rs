//! Axum route handlers for the batch control surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::batch::controller::{StartJobRequest, StartJobResponse};
use crate::errors::AppError;
use crate::models::job::BatchJob;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Uuid,
}

/// POST /api/v1/batch-jobs
///
/// Creates a job and returns immediately; processing continues in the background.
pub async fn handle_start(
    State(state): State<AppState>,
    Json(request): Json<StartJobRequest>,
) -> Result<(StatusCode, Json<StartJobResponse>), AppError> {
    let job = state.batch.start(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartJobResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

/// GET /api/v1/batch-jobs?tenant_id=
pub async fn handle_status(
    State(state): State<AppState>,
    Query(params): Query<TenantQuery>,
) -> Result<Json<BatchJob>, AppError> {
    Ok(Json(state.batch.status(params.tenant_id).await?))
}

/// POST /api/v1/batch-jobs/:id/pause
pub async fn handle_pause(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.batch.pause(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/batch-jobs/:id/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.batch.resume(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/batch-jobs/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.batch.cancel(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
