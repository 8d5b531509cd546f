use crate::types::DbId;

/// Domain error taxonomy shared by every crate in the workspace.
///
/// A collage owned by another user is reported as [`CoreError::NotFound`],
/// exactly like a collage that does not exist.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for the collage-not-found error.
    pub fn collage_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Collage",
            id,
        }
    }
}
