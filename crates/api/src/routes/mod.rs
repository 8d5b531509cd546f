pub mod collages;
pub mod health;
pub mod styles;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /styles                          style presets and option values (public)
///
/// /uploads                         request an upload target (POST)
///
/// /collages                        list, create
/// /collages/{id}                   get
/// /collages/{id}/export            export link (?target=instagram|tiktok)
/// /collages/{id}/live              WebSocket push of state changes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/styles", styles::router())
        .nest("/uploads", uploads::router())
        .nest("/collages", collages::router())
}
