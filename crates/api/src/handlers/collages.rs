//! Handlers for the `/collages` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Callers only ever
//! see their own collages; someone else's collage is reported as not found.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use moodboard_core::export::ExportTarget;
use moodboard_core::types::DbId;
use moodboard_pipeline::CollageSubmission;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct CreatedCollage {
    pub id: DbId,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub target: Option<String>,
}

/// POST /api/v1/collages
///
/// Submit a collage. Returns 201 with the new id while generation runs in
/// the background; the collage starts in `generating`.
pub async fn create_collage(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CollageSubmission>,
) -> AppResult<impl IntoResponse> {
    let id = state.collages.create_job(auth.user_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedCollage {
                id,
                status: "generating",
            },
        }),
    ))
}

/// GET /api/v1/collages
///
/// The caller's collages, newest first.
pub async fn list_collages(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let views = state.collages.list_jobs(auth.user_id).await?;
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/collages/{id}
pub async fn get_collage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state.collages.get_job(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/collages/{id}/export?target=instagram|tiktok
///
/// Download link and suggested filename for a completed collage. Returns 409
/// while the collage is still generating or after it failed.
pub async fn export_collage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let target: ExportTarget = params
        .target
        .ok_or_else(|| AppError::BadRequest("Missing required query parameter: target".into()))?
        .parse()?;

    let link = state.collages.export_job(auth.user_id, id, target).await?;
    Ok(Json(DataResponse { data: link }))
}
