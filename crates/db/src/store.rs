//! The [`CollageStore`] seam and its Postgres implementation.
//!
//! The service layer only talks to collages through this trait, so the
//! lifecycle can be exercised against [`crate::memory::MemoryCollageStore`]
//! without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use moodboard_core::collage::{CollageJob, NewCollage, ProductItem};
use moodboard_core::error::CoreError;
use moodboard_core::types::DbId;

use crate::repositories::CollageRepo;
use crate::DbPool;

/// Errors from a [`CollageStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row that breaks a model invariant.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Persistent store for collage jobs and their products.
///
/// Every mutation is an atomic record-level operation; there is no
/// cross-record locking.
#[async_trait]
pub trait CollageStore: Send + Sync {
    /// Persist a new collage in `generating` state together with its products.
    async fn insert(&self, input: &NewCollage) -> Result<CollageJob, StoreError>;

    /// Find a collage by id regardless of owner.
    async fn find(&self, id: DbId) -> Result<Option<CollageJob>, StoreError>;

    /// Find a collage by id only if `owner_id` owns it.
    async fn find_owned(&self, owner_id: DbId, id: DbId)
        -> Result<Option<CollageJob>, StoreError>;

    /// All collages of `owner_id`, newest first.
    async fn list_owned(&self, owner_id: DbId) -> Result<Vec<CollageJob>, StoreError>;

    /// Products of the given collages, keyed by collage id, in submission order.
    async fn products_for(
        &self,
        collage_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<ProductItem>>, StoreError>;

    /// `generating -> completed`. Returns `false` if the job was not generating.
    async fn mark_completed(&self, id: DbId, result_image_key: &str) -> Result<bool, StoreError>;

    /// `generating -> failed`. Returns `false` if the job was not generating.
    async fn mark_failed(&self, id: DbId, error_detail: &str) -> Result<bool, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// [`CollageStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgCollageStore {
    pool: DbPool,
}

impl PgCollageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollageStore for PgCollageStore {
    async fn insert(&self, input: &NewCollage) -> Result<CollageJob, StoreError> {
        let row = CollageRepo::create(&self.pool, input).await?;
        row.try_into()
    }

    async fn find(&self, id: DbId) -> Result<Option<CollageJob>, StoreError> {
        CollageRepo::find_by_id(&self.pool, id)
            .await?
            .map(CollageJob::try_from)
            .transpose()
    }

    async fn find_owned(
        &self,
        owner_id: DbId,
        id: DbId,
    ) -> Result<Option<CollageJob>, StoreError> {
        CollageRepo::find_for_owner(&self.pool, owner_id, id)
            .await?
            .map(CollageJob::try_from)
            .transpose()
    }

    async fn list_owned(&self, owner_id: DbId) -> Result<Vec<CollageJob>, StoreError> {
        CollageRepo::list_by_owner(&self.pool, owner_id)
            .await?
            .into_iter()
            .map(CollageJob::try_from)
            .collect()
    }

    async fn products_for(
        &self,
        collage_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<ProductItem>>, StoreError> {
        let mut grouped: HashMap<DbId, Vec<ProductItem>> = HashMap::new();
        if collage_ids.is_empty() {
            return Ok(grouped);
        }
        for row in CollageRepo::list_products(&self.pool, collage_ids).await? {
            grouped
                .entry(row.collage_id)
                .or_default()
                .push(ProductItem::from(row));
        }
        Ok(grouped)
    }

    async fn mark_completed(&self, id: DbId, result_image_key: &str) -> Result<bool, StoreError> {
        Ok(CollageRepo::mark_completed(&self.pool, id, result_image_key).await?)
    }

    async fn mark_failed(&self, id: DbId, error_detail: &str) -> Result<bool, StoreError> {
        Ok(CollageRepo::mark_failed(&self.pool, id, error_detail).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
