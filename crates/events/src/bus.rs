//! Event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the generation
//! pipeline (publisher) and live-update connections (subscribers).

use chrono::{DateTime, Utc};
use moodboard_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A collage was persisted and scheduled for generation.
pub const COLLAGE_CREATED: &str = "collage.created";
/// A collage reached `completed`.
pub const COLLAGE_COMPLETED: &str = "collage.completed";
/// A collage reached `failed`.
pub const COLLAGE_FAILED: &str = "collage.failed";

// ---------------------------------------------------------------------------
// CollageEvent
// ---------------------------------------------------------------------------

/// A change in the lifecycle of one collage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollageEvent {
    /// Dot-separated event name, one of the `COLLAGE_*` constants.
    pub event_type: String,

    pub collage_id: DbId,

    /// Owner of the collage; subscribers use it to avoid leaking events
    /// across users.
    pub owner_id: DbId,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl CollageEvent {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>, collage_id: DbId, owner_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            collage_id,
            owner_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Whether this event ends the collage's lifecycle.
    pub fn is_terminal(&self) -> bool {
        self.event_type == COLLAGE_COMPLETED || self.event_type == COLLAGE_FAILED
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use moodboard_events::bus::{CollageEvent, EventBus, COLLAGE_CREATED};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(CollageEvent::new(COLLAGE_CREATED, 1, 7));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<CollageEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: CollageEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollageEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
