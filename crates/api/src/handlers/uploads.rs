//! Handlers for the `/uploads` resource.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/uploads
///
/// Reserve a blob key and return a pre-signed URL the client uploads the
/// photo to directly. The key is then sent back when creating a collage.
pub async fn create_upload_target(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let target = state.collages.request_upload_target().await?;
    tracing::debug!(user_id = auth.user_id, blob_key = %target.blob_key, "Upload target issued");
    Ok(Json(DataResponse { data: target }))
}
