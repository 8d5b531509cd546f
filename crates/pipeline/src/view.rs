//! Read-side shapes returned to clients.
//!
//! Views carry retrievable URLs instead of raw blob keys.

use moodboard_core::collage::{CollageJob, ProductItem};
use moodboard_core::export::ExportTarget;
use moodboard_core::options::PresentationOptions;
use moodboard_core::types::{DbId, Timestamp};
use serde::Serialize;

/// A collage as seen by its owner.
#[derive(Debug, Clone, Serialize)]
pub struct CollageView {
    pub id: DbId,
    /// `generating`, `completed` or `failed`.
    pub status: &'static str,
    pub style_label: String,
    pub compiled_prompt: String,
    pub presentation_options: Option<PresentationOptions>,
    pub reference_image_url: String,
    /// Present only when `status` is `completed`.
    pub result_image_url: Option<String>,
    /// Present only when `status` is `failed`.
    pub error_detail: Option<String>,
    pub products: Vec<ProductView>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl CollageView {
    pub(crate) fn new(
        job: CollageJob,
        reference_image_url: String,
        result_image_url: Option<String>,
        products: Vec<ProductView>,
    ) -> Self {
        Self {
            id: job.id,
            status: job.state.name(),
            error_detail: job.state.error_detail().map(str::to_string),
            style_label: job.style_label,
            compiled_prompt: job.compiled_prompt,
            presentation_options: job.presentation_options,
            reference_image_url,
            result_image_url,
            products,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != "generating"
    }
}

/// One product of a collage, names exactly as submitted.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub position: i32,
    pub name: String,
    pub brand: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

impl ProductView {
    pub(crate) fn new(item: ProductItem, image_url: Option<String>) -> Self {
        Self {
            position: item.position,
            name: item.display_name,
            brand: item.brand_name,
            url: item.external_url,
            image_url,
        }
    }
}

/// Download information for sharing a finished collage.
#[derive(Debug, Clone, Serialize)]
pub struct ExportLink {
    pub collage_id: DbId,
    pub target: ExportTarget,
    pub download_url: String,
    /// Suggested filename for the download.
    pub filename: String,
}
