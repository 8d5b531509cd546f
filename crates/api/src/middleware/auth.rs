//! JWT-based authentication extractor for Axum handlers.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::{AUTHORIZATION, UPGRADE};
use axum::http::request::Parts;
use moodboard_core::error::CoreError;
use moodboard_core::types::DbId;
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller.
///
/// The token comes from the `Authorization: Bearer <token>` header. Browsers
/// cannot set headers on a WebSocket handshake, so upgrade requests may pass
/// it as an `access_token` query parameter instead.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The caller's id (from `claims.sub`).
    pub user_id: DbId,
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    unauthorized("Invalid Authorization format. Expected: Bearer <token>")
                })?
                .to_string(),
            None if is_websocket_upgrade(parts) => Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.access_token)
                .ok_or_else(|| unauthorized("Missing access token"))?,
            None => return Err(unauthorized("Missing Authorization header")),
        };

        let claims = validate_token(&token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

fn is_websocket_upgrade(parts: &Parts) -> bool {
    parts
        .headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.to_string()))
}
