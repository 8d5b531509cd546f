//! Collage job model, state machine, and submission validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::options::PresentationOptions;
use crate::prompt::PromptProduct;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of products on one collage.
pub const MAX_PRODUCTS: usize = 20;

/// Maximum length of a style label in characters.
pub const MAX_STYLE_LENGTH: usize = 200;

/// Maximum length of a product name or brand in characters.
pub const MAX_PRODUCT_FIELD_LENGTH: usize = 200;

/// Maximum length of a product URL in characters.
pub const MAX_URL_LENGTH: usize = 2_048;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a collage job.
///
/// `Generating` is the only entry state. `Completed` and `Failed` are
/// terminal and carry the data that only exists in that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Generating,
    Completed { result_image_key: String },
    Failed { error_detail: String },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generating)
    }

    pub fn result_image_key(&self) -> Option<&str> {
        match self {
            Self::Completed { result_image_key } => Some(result_image_key),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            Self::Failed { error_detail } => Some(error_detail),
            _ => None,
        }
    }

    /// Rebuild a state from its persisted parts, rejecting combinations that
    /// break the completed/failed invariants.
    pub fn from_parts(
        status: &str,
        result_image_key: Option<String>,
        error_detail: Option<String>,
    ) -> Result<Self, CoreError> {
        match (status, result_image_key, error_detail) {
            ("generating", None, None) => Ok(Self::Generating),
            ("completed", Some(result_image_key), None) => {
                Ok(Self::Completed { result_image_key })
            }
            ("failed", None, Some(error_detail)) => Ok(Self::Failed { error_detail }),
            (status, result, error) => Err(CoreError::Internal(format!(
                "Inconsistent collage state '{status}' (result set: {}, error set: {})",
                result.is_some(),
                error.is_some()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One collage-generation request and its lifecycle record.
#[derive(Debug, Clone)]
pub struct CollageJob {
    pub id: DbId,
    pub owner_id: DbId,
    pub reference_image_key: String,
    pub compiled_prompt: String,
    pub style_label: String,
    pub presentation_options: Option<PresentationOptions>,
    pub state: JobState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// A product shown in the outfit, owned by a collage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductItem {
    pub id: DbId,
    pub collage_id: DbId,
    pub position: i32,
    pub display_name: String,
    pub brand_name: String,
    pub external_url: Option<String>,
    pub reference_image_key: Option<String>,
}

/// A product as submitted by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Blob key of an optional per-product photo.
    #[serde(default)]
    pub image_key: Option<String>,
}

impl ProductInput {
    pub fn as_prompt_product(&self) -> PromptProduct<'_> {
        PromptProduct {
            name: &self.name,
            brand: &self.brand,
            url: self.url.as_deref(),
        }
    }
}

/// Everything needed to persist a new collage in `generating` state.
#[derive(Debug, Clone)]
pub struct NewCollage {
    pub owner_id: DbId,
    pub reference_image_key: String,
    pub compiled_prompt: String,
    pub style_label: String,
    pub presentation_options: Option<PresentationOptions>,
    pub products: Vec<ProductInput>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that the reference image key is present.
pub fn validate_reference_image(key: &str) -> Result<(), CoreError> {
    if key.trim().is_empty() {
        return Err(CoreError::Validation(
            "A reference image is required".to_string(),
        ));
    }
    Ok(())
}

/// Validate a style label: must be non-blank and within length limit.
pub fn validate_style(style: &str) -> Result<(), CoreError> {
    if style.trim().is_empty() {
        return Err(CoreError::Validation("Style must not be empty".to_string()));
    }
    if style.chars().count() > MAX_STYLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Style exceeds maximum length of {MAX_STYLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Clean the submitted product list.
///
/// Entries whose name or brand is blank are dropped. Kept entries are
/// trimmed at the edges, blank URLs and image keys become `None`. Rejects
/// the submission when nothing is left, or when limits are exceeded.
pub fn prepare_products(inputs: Vec<ProductInput>) -> Result<Vec<ProductInput>, CoreError> {
    let products: Vec<ProductInput> = inputs
        .into_iter()
        .filter(|p| !p.name.trim().is_empty() && !p.brand.trim().is_empty())
        .map(|p| ProductInput {
            name: p.name.trim().to_string(),
            brand: p.brand.trim().to_string(),
            url: non_blank(p.url),
            image_key: non_blank(p.image_key),
        })
        .collect();

    if products.is_empty() {
        return Err(CoreError::Validation(
            "At least one product with a name and brand is required".to_string(),
        ));
    }
    if products.len() > MAX_PRODUCTS {
        return Err(CoreError::Validation(format!(
            "A collage can list at most {MAX_PRODUCTS} products (got {})",
            products.len()
        )));
    }

    for p in &products {
        if p.name.chars().count() > MAX_PRODUCT_FIELD_LENGTH
            || p.brand.chars().count() > MAX_PRODUCT_FIELD_LENGTH
        {
            return Err(CoreError::Validation(format!(
                "Product name and brand must be at most {MAX_PRODUCT_FIELD_LENGTH} characters"
            )));
        }
        if p.url.as_ref().is_some_and(|u| u.len() > MAX_URL_LENGTH) {
            return Err(CoreError::Validation(format!(
                "Product URL exceeds maximum length of {MAX_URL_LENGTH} characters"
            )));
        }
    }

    Ok(products)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
