use std::sync::Arc;

use moodboard_events::EventBus;
use moodboard_pipeline::CollageService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Collage operations (submission, read side, export, uploads).
    pub collages: Arc<CollageService>,
    /// Lifecycle events, subscribed to by live-update sockets.
    pub events: Arc<EventBus>,
}
