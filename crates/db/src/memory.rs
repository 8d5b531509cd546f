//! In-memory [`CollageStore`] used by tests and database-less local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use moodboard_core::collage::{CollageJob, JobState, NewCollage, ProductItem};
use moodboard_core::types::DbId;

use crate::store::{CollageStore, StoreError};

#[derive(Default)]
struct Inner {
    next_collage_id: DbId,
    next_product_id: DbId,
    collages: BTreeMap<DbId, CollageJob>,
    products: Vec<ProductItem>,
}

/// [`CollageStore`] keeping everything in a mutex-guarded map.
///
/// Ids start at 1 and are never reused, like a `BIGSERIAL`.
#[derive(Default)]
pub struct MemoryCollageStore {
    inner: Mutex<Inner>,
}

impl MemoryCollageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store mutex poisoned".into()))
    }

    fn transition(&self, id: DbId, next: JobState) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.collages.get_mut(&id) {
            Some(job) if job.state == JobState::Generating => {
                let now = chrono::Utc::now();
                job.state = next;
                job.updated_at = now;
                job.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CollageStore for MemoryCollageStore {
    async fn insert(&self, input: &NewCollage) -> Result<CollageJob, StoreError> {
        let mut inner = self.lock()?;
        inner.next_collage_id += 1;
        let id = inner.next_collage_id;
        let now = chrono::Utc::now();

        let job = CollageJob {
            id,
            owner_id: input.owner_id,
            reference_image_key: input.reference_image_key.clone(),
            compiled_prompt: input.compiled_prompt.clone(),
            style_label: input.style_label.clone(),
            presentation_options: input.presentation_options.clone(),
            state: JobState::Generating,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        inner.collages.insert(id, job.clone());

        for (position, product) in input.products.iter().enumerate() {
            inner.next_product_id += 1;
            let product_id = inner.next_product_id;
            inner.products.push(ProductItem {
                id: product_id,
                collage_id: id,
                position: position as i32,
                display_name: product.name.clone(),
                brand_name: product.brand.clone(),
                external_url: product.url.clone(),
                reference_image_key: product.image_key.clone(),
            });
        }

        Ok(job)
    }

    async fn find(&self, id: DbId) -> Result<Option<CollageJob>, StoreError> {
        Ok(self.lock()?.collages.get(&id).cloned())
    }

    async fn find_owned(
        &self,
        owner_id: DbId,
        id: DbId,
    ) -> Result<Option<CollageJob>, StoreError> {
        Ok(self
            .lock()?
            .collages
            .get(&id)
            .filter(|job| job.owner_id == owner_id)
            .cloned())
    }

    async fn list_owned(&self, owner_id: DbId) -> Result<Vec<CollageJob>, StoreError> {
        let inner = self.lock()?;
        let mut jobs: Vec<CollageJob> = inner
            .collages
            .values()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn products_for(
        &self,
        collage_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<ProductItem>>, StoreError> {
        let inner = self.lock()?;
        let mut grouped: HashMap<DbId, Vec<ProductItem>> = HashMap::new();
        for product in inner
            .products
            .iter()
            .filter(|p| collage_ids.contains(&p.collage_id))
        {
            grouped
                .entry(product.collage_id)
                .or_default()
                .push(product.clone());
        }
        for products in grouped.values_mut() {
            products.sort_by_key(|p| p.position);
        }
        Ok(grouped)
    }

    async fn mark_completed(&self, id: DbId, result_image_key: &str) -> Result<bool, StoreError> {
        self.transition(
            id,
            JobState::Completed {
                result_image_key: result_image_key.to_string(),
            },
        )
    }

    async fn mark_failed(&self, id: DbId, error_detail: &str) -> Result<bool, StoreError> {
        self.transition(
            id,
            JobState::Failed {
                error_detail: error_detail.to_string(),
            },
        )
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use moodboard_core::collage::ProductInput;

    use super::*;

    fn new_collage(owner_id: DbId) -> NewCollage {
        NewCollage {
            owner_id,
            reference_image_key: "uploads/ref".into(),
            compiled_prompt: "prompt".into(),
            style_label: "Minimalist and clean".into(),
            presentation_options: None,
            products: vec![
                ProductInput {
                    name: "Vintage Denim Jacket".into(),
                    brand: "Levi's".into(),
                    ..Default::default()
                },
                ProductInput {
                    name: "Chuck 70".into(),
                    brand: "Converse".into(),
                    ..Default::default()
                },
            ],
        }
    }

    #[tokio::test]
    async fn insert_starts_generating_with_products() {
        let store = MemoryCollageStore::new();
        let job = store.insert(&new_collage(1)).await.unwrap();

        assert_eq!(job.state, JobState::Generating);
        assert_eq!(job.completed_at, None);

        let products = store.products_for(&[job.id]).await.unwrap();
        let names: Vec<_> = products[&job.id]
            .iter()
            .map(|p| p.display_name.as_str())
            .collect();
        assert_eq!(names, ["Vintage Denim Jacket", "Chuck 70"]);
    }

    #[tokio::test]
    async fn transitions_happen_once() {
        let store = MemoryCollageStore::new();
        let job = store.insert(&new_collage(1)).await.unwrap();

        assert!(store.mark_completed(job.id, "results/1.png").await.unwrap());
        assert!(!store.mark_failed(job.id, "late failure").await.unwrap());
        assert!(!store.mark_completed(job.id, "results/2.png").await.unwrap());

        let stored = store.find(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state.result_image_key(), Some("results/1.png"));
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn transition_of_missing_job_is_false() {
        let store = MemoryCollageStore::new();
        assert!(!store.mark_failed(99, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn ownership_filters_reads() {
        let store = MemoryCollageStore::new();
        let first = store.insert(&new_collage(1)).await.unwrap();
        let second = store.insert(&new_collage(1)).await.unwrap();
        store.insert(&new_collage(2)).await.unwrap();

        assert!(store.find_owned(2, first.id).await.unwrap().is_none());
        let listed: Vec<_> = store
            .list_owned(1)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(listed, [second.id, first.id]);
    }
}
