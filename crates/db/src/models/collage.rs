//! Row types for the `collages` and `collage_products` tables.

use moodboard_core::collage::{CollageJob, JobState, ProductItem};
use moodboard_core::options::PresentationOptions;
use moodboard_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

use super::status::{CollageStatus, StatusId};
use crate::store::StoreError;

/// A row from the `collages` table.
#[derive(Debug, Clone, FromRow)]
pub struct CollageRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub reference_image_key: String,
    pub result_image_key: Option<String>,
    pub compiled_prompt: String,
    pub style_label: String,
    pub presentation_options: Option<Json<PresentationOptions>>,
    pub status_id: StatusId,
    pub error_detail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<CollageRow> for CollageJob {
    type Error = StoreError;

    fn try_from(row: CollageRow) -> Result<Self, Self::Error> {
        let status = CollageStatus::from_id(row.status_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "collage {} has unknown status_id {}",
                row.id, row.status_id
            ))
        })?;

        let state = JobState::from_parts(status.name(), row.result_image_key, row.error_detail)
            .map_err(|e| StoreError::Corrupt(format!("collage {}: {e}", row.id)))?;

        Ok(CollageJob {
            id: row.id,
            owner_id: row.owner_id,
            reference_image_key: row.reference_image_key,
            compiled_prompt: row.compiled_prompt,
            style_label: row.style_label,
            presentation_options: row.presentation_options.map(|Json(opts)| opts),
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

/// A row from the `collage_products` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: DbId,
    pub collage_id: DbId,
    pub position: i32,
    pub display_name: String,
    pub brand_name: String,
    pub external_url: Option<String>,
    pub reference_image_key: Option<String>,
    pub created_at: Timestamp,
}

impl From<ProductRow> for ProductItem {
    fn from(row: ProductRow) -> Self {
        ProductItem {
            id: row.id,
            collage_id: row.collage_id,
            position: row.position,
            display_name: row.display_name,
            brand_name: row.brand_name,
            external_url: row.external_url,
            reference_image_key: row.reference_image_key,
        }
    }
}
