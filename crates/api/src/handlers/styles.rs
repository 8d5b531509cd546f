//! Style presets and presentation option values for the submission form.

use axum::response::IntoResponse;
use axum::Json;
use moodboard_core::prompt::{ALL_TABLES, STYLE_PRESETS};
use serde::Serialize;

use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct StyleCatalog {
    /// Suggested style labels. Any non-blank style is accepted.
    pub presets: &'static [&'static str],
    pub options: Vec<OptionField>,
}

/// One enum-valued presentation option and its known values.
#[derive(Debug, Serialize)]
pub struct OptionField {
    pub field: &'static str,
    pub label: &'static str,
    pub values: Vec<&'static str>,
}

/// GET /api/v1/styles
///
/// Public; the catalog is static.
pub async fn list_styles() -> impl IntoResponse {
    let options = ALL_TABLES
        .iter()
        .map(|table| OptionField {
            field: table.field,
            label: table.heading,
            values: table.values().collect(),
        })
        .collect();

    Json(DataResponse {
        data: StyleCatalog {
            presets: STYLE_PRESETS,
            options,
        },
    })
}
