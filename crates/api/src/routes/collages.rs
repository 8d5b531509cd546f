//! Route definitions for the `/collages` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::{collages, live};
use crate::state::AppState;

/// Routes mounted at `/collages`.
///
/// ```text
/// GET    /                -> list_collages
/// POST   /                -> create_collage
/// GET    /{id}            -> get_collage
/// GET    /{id}/export     -> export_collage
/// GET    /{id}/live       -> live_collage (WebSocket)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(collages::list_collages).post(collages::create_collage),
        )
        .route("/{id}", get(collages::get_collage))
        .route("/{id}/export", get(collages::export_collage))
        .route("/{id}/live", get(live::live_collage))
}
