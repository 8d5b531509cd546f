//! Deferred execution of generation tasks.
//!
//! Submission never awaits generation; it hands the collage id to a
//! [`GenerationScheduler`] and returns. A consumer in [`crate::dispatcher`]
//! later calls [`crate::CollageService::run_generation`] for the id.

use std::time::Duration;

use async_trait::async_trait;
use moodboard_core::types::DbId;
use moodboard_db::repositories::GenerationTaskRepo;
use moodboard_db::DbPool;
use tokio::sync::mpsc;

/// Errors from a [`GenerationScheduler`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The consumer side has shut down; nothing will run the task.
    #[error("Generation scheduler is closed")]
    Closed,

    /// The durable queue could not be written.
    #[error("Task queue error: {0}")]
    Queue(#[from] sqlx::Error),
}

/// Injected deferred-execution facility.
#[async_trait]
pub trait GenerationScheduler: Send + Sync {
    /// Arrange for generation of `collage_id` to run after `delay`.
    async fn enqueue(&self, delay: Duration, collage_id: DbId) -> Result<(), SchedulerError>;
}

// ---------------------------------------------------------------------------
// TokioScheduler
// ---------------------------------------------------------------------------

/// In-process scheduler: delayed ids are delivered over an mpsc channel.
///
/// Tasks live only in memory and are lost on restart. The receiving end is
/// drained by [`crate::dispatcher::run_scheduled_generations`].
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<DbId>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its ids are delivered to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DbId>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl GenerationScheduler for TokioScheduler {
    async fn enqueue(&self, delay: Duration, collage_id: DbId) -> Result<(), SchedulerError> {
        if delay.is_zero() {
            return self
                .sender
                .send(collage_id)
                .map_err(|_| SchedulerError::Closed);
        }

        if self.sender.is_closed() {
            return Err(SchedulerError::Closed);
        }
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(collage_id).is_err() {
                tracing::warn!(collage_id, "Scheduler closed before delayed task fired");
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgTaskQueue
// ---------------------------------------------------------------------------

/// Durable scheduler writing to the `generation_tasks` table.
///
/// Drained by [`crate::dispatcher::TaskDispatcher`]; tasks survive restarts
/// of the process that enqueued them.
#[derive(Clone)]
pub struct PgTaskQueue {
    pool: DbPool,
}

impl PgTaskQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationScheduler for PgTaskQueue {
    async fn enqueue(&self, delay: Duration, collage_id: DbId) -> Result<(), SchedulerError> {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        let run_at = chrono::Utc::now() + delay;
        let task_id = GenerationTaskRepo::enqueue(&self.pool, collage_id, run_at).await?;
        tracing::debug!(task_id, collage_id, %run_at, "Generation task enqueued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn immediate_enqueue_is_delivered() {
        let (scheduler, mut rx) = TokioScheduler::new();
        scheduler.enqueue(Duration::ZERO, 7).await.unwrap();
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_enqueue_waits_for_delay() {
        let (scheduler, mut rx) = TokioScheduler::new();
        scheduler
            .enqueue(Duration::from_secs(30), 11)
            .await
            .unwrap();

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(rx.recv().await, Some(11));
    }

    #[tokio::test]
    async fn enqueue_after_receiver_dropped_is_closed() {
        let (scheduler, rx) = TokioScheduler::new();
        drop(rx);
        assert_matches!(
            scheduler.enqueue(Duration::ZERO, 1).await,
            Err(SchedulerError::Closed)
        );
        assert_matches!(
            scheduler.enqueue(Duration::from_secs(1), 1).await,
            Err(SchedulerError::Closed)
        );
    }
}
