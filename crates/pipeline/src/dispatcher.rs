//! Consumers that execute scheduled generation tasks.
//!
//! Each claimed collage id is run on its own Tokio task so a slow generator
//! call does not hold up the rest of the queue. Those tasks are spawned on a
//! caller-owned [`TaskTracker`]; at shutdown the caller closes the tracker and
//! waits on it so every started generation writes its terminal state.

use std::sync::Arc;
use std::time::Duration;

use moodboard_core::types::DbId;
use moodboard_db::repositories::GenerationTaskRepo;
use moodboard_db::DbPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::service::CollageService;

/// Default polling interval for the task dispatcher loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest accepted polling interval. `tokio::time::interval` panics on zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default number of tasks claimed per poll.
const DEFAULT_BATCH_SIZE: i64 = 8;

/// Drains the `generation_tasks` table written by
/// [`crate::scheduler::PgTaskQueue`].
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so several API processes can run a
/// dispatcher against the same database without double-dispatch.
pub struct TaskDispatcher {
    pool: DbPool,
    service: Arc<CollageService>,
    tracker: TaskTracker,
    poll_interval: Duration,
    batch_size: i64,
}

impl TaskDispatcher {
    pub fn new(pool: DbPool, service: Arc<CollageService>, tracker: TaskTracker) -> Self {
        Self {
            pool,
            service,
            tracker,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// Generations already claimed keep running on the tracker after this
    /// returns.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Generation task dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Generation task dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.dispatch_due().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// One dispatch cycle: claim due tasks and start their generation.
    async fn dispatch_due(&self) -> Result<(), sqlx::Error> {
        let claimed = GenerationTaskRepo::claim_due(&self.pool, self.batch_size).await?;
        for collage_id in claimed {
            tracing::debug!(collage_id, "Generation task claimed");
            spawn_generation(&self.tracker, &self.service, collage_id);
        }
        Ok(())
    }
}

/// Drain the receiver of a [`crate::scheduler::TokioScheduler`] until it
/// closes or `cancel` fires.
///
/// On cancellation the receiver is closed and ids already queued in it are
/// still started, so no accepted job is left without a generation run.
pub async fn run_scheduled_generations(
    service: Arc<CollageService>,
    mut receiver: mpsc::UnboundedReceiver<DbId>,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    tracing::info!("In-process generation worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                receiver.close();
                let mut drained = 0usize;
                while let Ok(collage_id) = receiver.try_recv() {
                    spawn_generation(&tracker, &service, collage_id);
                    drained += 1;
                }
                tracing::info!(drained, "In-process generation worker shutting down");
                break;
            }
            next = receiver.recv() => match next {
                Some(collage_id) => spawn_generation(&tracker, &service, collage_id),
                None => {
                    tracing::info!("Generation scheduler closed, worker exiting");
                    break;
                }
            },
        }
    }
}

fn spawn_generation(tracker: &TaskTracker, service: &Arc<CollageService>, collage_id: DbId) {
    let service = Arc::clone(service);
    tracker.spawn(async move {
        service.run_generation(collage_id).await;
    });
}
