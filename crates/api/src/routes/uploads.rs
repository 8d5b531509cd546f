//! Route definitions for the `/uploads` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::uploads;
use crate::state::AppState;

/// Routes mounted at `/uploads`.
///
/// ```text
/// POST   /                -> create_upload_target
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(uploads::create_upload_target))
}
