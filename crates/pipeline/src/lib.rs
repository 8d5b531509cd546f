//! Collage job lifecycle.
//!
//! - [`service`] -- the [`service::CollageService`] operations: submission,
//!   read side, export, and the generation task body.
//! - [`scheduler`] -- the deferred-execution seam and its two backends.
//! - [`dispatcher`] -- long-running consumers that turn scheduled ids into
//!   [`service::CollageService::run_generation`] calls.
//! - [`view`] -- response shapes with blob keys resolved into URLs.

pub mod dispatcher;
pub mod scheduler;
pub mod service;
pub mod view;

pub use scheduler::{GenerationScheduler, PgTaskQueue, SchedulerError, TokioScheduler};
pub use service::{CollageService, CollageSubmission};
