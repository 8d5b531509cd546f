//! Live collage updates over WebSocket.
//!
//! The socket first receives the current view of the collage, then a fresh
//! view each time a lifecycle event for it is published. The server closes
//! the socket once the collage is `completed` or `failed`.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use moodboard_core::types::DbId;
use moodboard_events::CollageEvent;
use moodboard_pipeline::view::CollageView;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Close code for a normal closure.
const CLOSE_NORMAL: u16 = 1000;

/// GET /api/v1/collages/{id}/live
///
/// Ownership is checked before the upgrade, so a foreign collage is a plain
/// 404 response rather than a socket.
pub async fn live_collage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    // Subscribe before taking the snapshot so no transition is missed.
    let events = state.events.subscribe();
    let snapshot = state.collages.get_job(auth.user_id, id).await?;

    Ok(ws.on_upgrade(move |socket| stream_collage(socket, state, auth.user_id, snapshot, events)))
}

async fn stream_collage(
    socket: WebSocket,
    state: AppState,
    owner_id: DbId,
    snapshot: CollageView,
    mut events: broadcast::Receiver<CollageEvent>,
) {
    let collage_id = snapshot.id;
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, collage_id, "Live collage socket connected");

    let (mut sink, mut stream) = socket.split();

    let mut finished = snapshot.is_terminal();
    if send_view(&mut sink, &snapshot).await.is_err() {
        return;
    }

    while !finished {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
            event = events.recv() => {
                match event {
                    Ok(event) if event.collage_id != collage_id || event.owner_id != owner_id => {
                        continue;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(conn_id = %conn_id, skipped, "Live socket lagged, resending view");
                    }
                    Err(RecvError::Closed) => break,
                }

                let view = match state.collages.get_job(owner_id, collage_id).await {
                    Ok(view) => view,
                    Err(e) => {
                        tracing::warn!(conn_id = %conn_id, collage_id, error = %e, "Failed to load collage for live update");
                        break;
                    }
                };
                finished = view.is_terminal();
                if send_view(&mut sink, &view).await.is_err() {
                    break;
                }
            }
        }
    }

    if finished {
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_NORMAL,
                reason: "collage finished".into(),
            })))
            .await;
    }
    tracing::info!(conn_id = %conn_id, collage_id, "Live collage socket disconnected");
}

async fn send_view(
    sink: &mut SplitSink<WebSocket, Message>,
    view: &CollageView,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(&DataResponse { data: view }) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(collage_id = view.id, error = %e, "Failed to serialize collage view");
            return Err(axum::Error::new(e));
        }
    };
    sink.send(Message::Text(text.into())).await
}
