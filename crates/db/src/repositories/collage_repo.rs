//! Repository for the `collages` and `collage_products` tables.
//!
//! Terminal transitions are conditional on the row still being in
//! `generating`, so a job leaves that state at most once no matter how many
//! generation tasks run for it.

use moodboard_core::collage::NewCollage;
use moodboard_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::collage::{CollageRow, ProductRow};
use crate::models::status::CollageStatus;

/// Column list for `collages` queries.
const COLUMNS: &str = "\
    id, owner_id, reference_image_key, result_image_key, compiled_prompt, \
    style_label, presentation_options, status_id, error_detail, \
    created_at, updated_at, completed_at";

/// Column list for `collage_products` queries.
const PRODUCT_COLUMNS: &str = "\
    id, collage_id, position, display_name, brand_name, external_url, \
    reference_image_key, created_at";

/// Provides CRUD operations for collages and their products.
pub struct CollageRepo;

impl CollageRepo {
    /// Insert a collage in `generating` state together with its products,
    /// in one transaction.
    pub async fn create(pool: &PgPool, input: &NewCollage) -> Result<CollageRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO collages \
                 (owner_id, reference_image_key, compiled_prompt, style_label, \
                  presentation_options, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CollageRow>(&query)
            .bind(input.owner_id)
            .bind(&input.reference_image_key)
            .bind(&input.compiled_prompt)
            .bind(&input.style_label)
            .bind(input.presentation_options.as_ref().map(Json))
            .bind(CollageStatus::Generating.id())
            .fetch_one(&mut *tx)
            .await?;

        for (position, product) in input.products.iter().enumerate() {
            sqlx::query(
                "INSERT INTO collage_products \
                     (collage_id, position, display_name, brand_name, external_url, \
                      reference_image_key) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(&product.url)
            .bind(&product.image_key)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Find a collage by ID regardless of owner.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CollageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collages WHERE id = $1");
        sqlx::query_as::<_, CollageRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a collage by ID only if it belongs to `owner_id`.
    pub async fn find_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        id: DbId,
    ) -> Result<Option<CollageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collages WHERE id = $1 AND owner_id = $2");
        sqlx::query_as::<_, CollageRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's collages, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<CollageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collages \
             WHERE owner_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CollageRow>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Products of the given collages, grouped by collage in submission order.
    pub async fn list_products(
        pool: &PgPool,
        collage_ids: &[DbId],
    ) -> Result<Vec<ProductRow>, sqlx::Error> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM collage_products \
             WHERE collage_id = ANY($1) \
             ORDER BY collage_id, position"
        );
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(collage_ids)
            .fetch_all(pool)
            .await
    }

    /// Move a generating collage to `completed`.
    ///
    /// Returns `false` if the collage does not exist or already left
    /// `generating`.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        result_image_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE collages \
             SET status_id = $2, result_image_key = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(CollageStatus::Completed.id())
        .bind(result_image_key)
        .bind(CollageStatus::Generating.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a generating collage to `failed` with a human-readable detail.
    ///
    /// Returns `false` if the collage does not exist or already left
    /// `generating`.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_detail: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE collages \
             SET status_id = $2, error_detail = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(CollageStatus::Failed.id())
        .bind(error_detail)
        .bind(CollageStatus::Generating.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
