//! Repository for the `generation_tasks` queue table.

use moodboard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

/// Durable deferred-execution queue for collage generation.
pub struct GenerationTaskRepo;

impl GenerationTaskRepo {
    /// Schedule generation of `collage_id` at `run_at`. Returns the task id.
    pub async fn enqueue(
        pool: &PgPool,
        collage_id: DbId,
        run_at: Timestamp,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO generation_tasks (collage_id, run_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(collage_id)
        .bind(run_at)
        .fetch_one(pool)
        .await
    }

    /// Atomically claim up to `limit` due tasks, returning their collage ids.
    ///
    /// Claimed rows are deleted. Uses `FOR UPDATE SKIP LOCKED` so several
    /// dispatchers can drain the queue without double-claiming.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "DELETE FROM generation_tasks \
             WHERE id IN ( \
                 SELECT id FROM generation_tasks \
                 WHERE run_at <= NOW() \
                 ORDER BY run_at ASC, id ASC \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING collage_id",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
