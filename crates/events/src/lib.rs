//! In-process collage lifecycle events.
//!
//! The pipeline publishes an event whenever a collage is created or reaches
//! a terminal state; live-update connections subscribe and filter by collage.

pub mod bus;

pub use bus::{CollageEvent, EventBus};
