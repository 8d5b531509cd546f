//! Collage operations on top of the injected collaborators.
//!
//! Lifecycle:
//!
//! | From         | Event                | To          |
//! |--------------|----------------------|-------------|
//! | --           | valid submission     | `generating`|
//! | `generating` | generation succeeds  | `completed` |
//! | `generating` | generation fails     | `failed`    |
//!
//! Terminal transitions are conditional on the job still being
//! `generating`, so a task that runs twice changes nothing the second time.

use std::sync::Arc;
use std::time::Duration;

use moodboard_core::collage::{
    prepare_products, validate_reference_image, validate_style, CollageJob, NewCollage,
    ProductInput, ProductItem,
};
use moodboard_core::error::CoreError;
use moodboard_core::export::{export_filename, ExportTarget};
use moodboard_core::options::PresentationOptions;
use moodboard_core::prompt::compile_prompt;
use moodboard_core::types::DbId;
use moodboard_db::store::CollageStore;
use moodboard_events::bus::{COLLAGE_COMPLETED, COLLAGE_CREATED, COLLAGE_FAILED};
use moodboard_events::{CollageEvent, EventBus};
use moodboard_imagegen::{GenerationRequest, GeneratorError, ImageGenerator, InputImage};
use moodboard_storage::{
    extension_for, is_upload_key, new_result_key, BlobStore, StorageError, StoredBlob,
    UploadTarget,
};
use serde::Deserialize;

use crate::scheduler::GenerationScheduler;
use crate::view::{CollageView, ExportLink, ProductView};

/// MIME type assumed for blobs stored without one.
const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Stored as the failure detail when the task could not be scheduled.
const SCHEDULING_FAILED_DETAIL: &str = "Generation could not be scheduled";

/// A collage submission as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollageSubmission {
    #[serde(default)]
    pub reference_image_key: String,
    #[serde(default)]
    pub products: Vec<ProductInput>,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub options: Option<PresentationOptions>,
}

/// Why a generation task ended in `failed`. The display string becomes the
/// collage's `error_detail`.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Reference image could not be read: {0}")]
    ReferenceImage(StorageError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("Generated image could not be stored: {0}")]
    StoreResult(StorageError),
}

/// Entry point for every collage operation.
pub struct CollageService {
    store: Arc<dyn CollageStore>,
    blobs: Arc<dyn BlobStore>,
    generator: Arc<dyn ImageGenerator>,
    scheduler: Arc<dyn GenerationScheduler>,
    events: Arc<EventBus>,
}

impl CollageService {
    pub fn new(
        store: Arc<dyn CollageStore>,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn ImageGenerator>,
        scheduler: Arc<dyn GenerationScheduler>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            blobs,
            generator,
            scheduler,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Validate a submission, persist it in `generating`, and schedule its
    /// generation. Returns as soon as the task is enqueued.
    pub async fn create_job(
        &self,
        owner_id: DbId,
        submission: CollageSubmission,
    ) -> Result<DbId, CoreError> {
        validate_reference_image(&submission.reference_image_key)?;
        validate_style(&submission.style)?;
        let mut products = prepare_products(submission.products)?;

        let reference_image_key = submission.reference_image_key.trim().to_string();
        if !is_upload_key(&reference_image_key) || !self.blobs.exists(&reference_image_key).await?
        {
            return Err(CoreError::Validation(
                "Reference image has not been uploaded".to_string(),
            ));
        }

        for product in &mut products {
            let Some(key) = product.image_key.take() else {
                continue;
            };
            if is_upload_key(&key) && self.blobs.exists(&key).await? {
                product.image_key = Some(key);
            } else {
                tracing::warn!(
                    owner_id,
                    product = %product.name,
                    image_key = %key,
                    "Product image not found in storage, keeping product without it",
                );
            }
        }

        let options = submission.options.and_then(PresentationOptions::normalized);
        let prompt_products: Vec<_> = products.iter().map(ProductInput::as_prompt_product).collect();
        let compiled_prompt = compile_prompt(&submission.style, &prompt_products, options.as_ref());

        let job = self
            .store
            .insert(&NewCollage {
                owner_id,
                reference_image_key,
                compiled_prompt,
                style_label: submission.style,
                presentation_options: options,
                products,
            })
            .await?;

        self.events.publish(
            CollageEvent::new(COLLAGE_CREATED, job.id, owner_id)
                .with_payload(serde_json::json!({ "status": job.state.name() })),
        );

        if let Err(e) = self.scheduler.enqueue(Duration::ZERO, job.id).await {
            tracing::error!(collage_id = job.id, error = %e, "Failed to schedule generation");
            self.fail(job.id, owner_id, SCHEDULING_FAILED_DETAIL).await;
            return Err(CoreError::Internal(format!(
                "Failed to schedule generation: {e}"
            )));
        }

        tracing::info!(collage_id = job.id, owner_id, "Collage submitted");
        Ok(job.id)
    }

    /// Reserve a location for a direct client upload.
    pub async fn request_upload_target(&self) -> Result<UploadTarget, CoreError> {
        Ok(self.blobs.create_upload_target().await?)
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// One collage of `owner_id`. Collages of other owners are not found.
    pub async fn get_job(&self, owner_id: DbId, id: DbId) -> Result<CollageView, CoreError> {
        let job = self.find_owned(owner_id, id).await?;
        let products = self
            .store
            .products_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        self.render(job, products).await
    }

    /// All collages of `owner_id`, newest first.
    pub async fn list_jobs(&self, owner_id: DbId) -> Result<Vec<CollageView>, CoreError> {
        let jobs = self.store.list_owned(owner_id).await?;
        let ids: Vec<DbId> = jobs.iter().map(|j| j.id).collect();
        let mut products = self.store.products_for(&ids).await?;

        let mut views = Vec::with_capacity(jobs.len());
        for job in jobs {
            let items = products.remove(&job.id).unwrap_or_default();
            views.push(self.render(job, items).await?);
        }
        Ok(views)
    }

    /// Download link for a completed collage.
    pub async fn export_job(
        &self,
        owner_id: DbId,
        id: DbId,
        target: ExportTarget,
    ) -> Result<ExportLink, CoreError> {
        let job = self.find_owned(owner_id, id).await?;
        let Some(key) = job.state.result_image_key() else {
            return Err(CoreError::Conflict(format!(
                "Collage {id} is {} and cannot be exported",
                job.state.name()
            )));
        };

        Ok(ExportLink {
            collage_id: id,
            target,
            download_url: self.blobs.download_url(key).await?,
            filename: export_filename(target, chrono::Utc::now()),
        })
    }

    /// Whether the collage store answers.
    pub async fn store_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }

    async fn find_owned(&self, owner_id: DbId, id: DbId) -> Result<CollageJob, CoreError> {
        self.store
            .find_owned(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::collage_not_found(id))
    }

    async fn render(
        &self,
        job: CollageJob,
        products: Vec<ProductItem>,
    ) -> Result<CollageView, CoreError> {
        let reference_image_url = self.blobs.download_url(&job.reference_image_key).await?;
        let result_image_url = match job.state.result_image_key() {
            Some(key) => Some(self.blobs.download_url(key).await?),
            None => None,
        };

        let mut product_views = Vec::with_capacity(products.len());
        for item in products {
            let image_url = match &item.reference_image_key {
                Some(key) => Some(self.blobs.download_url(key).await?),
                None => None,
            };
            product_views.push(ProductView::new(item, image_url));
        }

        Ok(CollageView::new(
            job,
            reference_image_url,
            result_image_url,
            product_views,
        ))
    }

    // -----------------------------------------------------------------------
    // Generation task
    // -----------------------------------------------------------------------

    /// Body of the deferred generation task.
    ///
    /// Performs at most one terminal transition and never returns an error:
    /// every failure is recorded on the collage or logged.
    pub async fn run_generation(&self, collage_id: DbId) {
        let job = match self.store.find(collage_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(collage_id, "Generation task for unknown collage, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(collage_id, error = %e, "Failed to load collage for generation");
                return;
            }
        };

        if job.state.is_terminal() {
            tracing::info!(
                collage_id,
                status = job.state.name(),
                "Collage already finished, skipping generation",
            );
            return;
        }

        tracing::info!(collage_id, "Generation started");
        match self.generate(&job).await {
            Ok(result_image_key) => self.complete(&job, &result_image_key).await,
            Err(e) => {
                tracing::warn!(collage_id, error = %e, "Generation failed");
                self.fail(collage_id, job.owner_id, &e.to_string()).await;
            }
        }
    }

    async fn generate(&self, job: &CollageJob) -> Result<String, GenerationError> {
        let reference = self
            .blobs
            .get(&job.reference_image_key)
            .await
            .map_err(GenerationError::ReferenceImage)?;

        let request = GenerationRequest {
            prompt: job.compiled_prompt.clone(),
            reference_image: input_image(reference),
            product_images: self.product_images(job.id).await,
        };

        let image = self.generator.generate(&request).await?;

        let key = new_result_key(job.id, extension_for(&image.content_type));
        self.blobs
            .put(&key, image.bytes, &image.content_type)
            .await
            .map_err(GenerationError::StoreResult)?;
        Ok(key)
    }

    /// Close-up photos of the collage's products. Unreadable ones are skipped.
    async fn product_images(&self, collage_id: DbId) -> Vec<InputImage> {
        let products = match self.store.products_for(&[collage_id]).await {
            Ok(mut grouped) => grouped.remove(&collage_id).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(collage_id, error = %e, "Could not load products for generation");
                return Vec::new();
            }
        };

        let mut images = Vec::new();
        for key in products.iter().filter_map(|p| p.reference_image_key.as_deref()) {
            match self.blobs.get(key).await {
                Ok(blob) => images.push(input_image(blob)),
                Err(e) => {
                    tracing::warn!(collage_id, image_key = key, error = %e, "Skipping product image");
                }
            }
        }
        images
    }

    async fn complete(&self, job: &CollageJob, result_image_key: &str) {
        match self.store.mark_completed(job.id, result_image_key).await {
            Ok(true) => {
                tracing::info!(collage_id = job.id, result_image_key, "Collage completed");
                self.events.publish(
                    CollageEvent::new(COLLAGE_COMPLETED, job.id, job.owner_id).with_payload(
                        serde_json::json!({ "result_image_key": result_image_key }),
                    ),
                );
            }
            Ok(false) => {
                tracing::info!(
                    collage_id = job.id,
                    result_image_key,
                    "Collage finished concurrently, discarding result",
                );
            }
            Err(e) => {
                tracing::error!(collage_id = job.id, error = %e, "Failed to record completion");
            }
        }
    }

    async fn fail(&self, collage_id: DbId, owner_id: DbId, error_detail: &str) {
        match self.store.mark_failed(collage_id, error_detail).await {
            Ok(true) => {
                self.events.publish(
                    CollageEvent::new(COLLAGE_FAILED, collage_id, owner_id)
                        .with_payload(serde_json::json!({ "error_detail": error_detail })),
                );
            }
            Ok(false) => {
                tracing::info!(collage_id, "Collage finished concurrently, failure not recorded");
            }
            Err(e) => {
                tracing::error!(collage_id, error = %e, "Failed to record failure");
            }
        }
    }
}

fn input_image(blob: StoredBlob) -> InputImage {
    InputImage {
        mime_type: blob
            .content_type
            .filter(|t| t.starts_with("image/"))
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
        bytes: blob.bytes,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
