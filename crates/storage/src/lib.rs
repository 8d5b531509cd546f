//! Blob storage for reference photos and generated collages.
//!
//! Clients upload photos directly to the store through a pre-signed URL
//! obtained from [`BlobStore::create_upload_target`]; the service only ever
//! handles blob keys, plus the bytes it forwards to and from the generator.
//!
//! - [`s3`] -- S3-compatible implementation using `aws-sdk-s3` presigning.
//! - [`memory`] -- in-process implementation for tests and local runs.

use async_trait::async_trait;
use moodboard_core::error::CoreError;
use moodboard_core::types::{DbId, Timestamp};
use serde::Serialize;

pub mod memory;
pub mod s3;

/// Key prefix for client uploads.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Key prefix for generated collages.
pub const RESULT_PREFIX: &str = "results/";

/// Errors from a [`BlobStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested blob does not exist.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// A pre-signed URL could not be produced.
    #[error("Presigning failed: {0}")]
    Presign(String),

    /// The storage backend rejected or failed the request.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// A write location for a client-side direct upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTarget {
    /// Key to send back when creating a collage.
    pub blob_key: String,
    /// URL the client uploads the photo bytes to.
    pub upload_url: String,
    /// HTTP method for the upload.
    pub method: &'static str,
    /// When `upload_url` stops working.
    pub expires_at: Timestamp,
}

/// A blob read back from the store.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Managed blob store collaborator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reserve a fresh upload key and return where the client should upload.
    async fn create_upload_target(&self) -> Result<UploadTarget, StorageError>;

    /// Whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// A time-limited URL from which `key` can be downloaded.
    async fn download_url(&self, key: &str) -> Result<String, StorageError>;

    /// Read a whole blob.
    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError>;

    /// Write a whole blob.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;
}

/// A fresh, unguessable key under [`UPLOAD_PREFIX`].
pub fn new_upload_key() -> String {
    format!("{UPLOAD_PREFIX}{}", uuid::Uuid::now_v7())
}

/// A fresh key under [`RESULT_PREFIX`] for the output of `collage_id`.
pub fn new_result_key(collage_id: DbId, extension: &str) -> String {
    format!(
        "{RESULT_PREFIX}{collage_id}/{}.{extension}",
        uuid::Uuid::now_v7()
    )
}

/// Whether `key` looks like a key handed out by [`new_upload_key`].
///
/// Clients may only reference uploads, never generated results or paths
/// that escape the prefix.
pub fn is_upload_key(key: &str) -> bool {
    key.strip_prefix(UPLOAD_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/') && !rest.contains(".."))
}

/// File extension for an image MIME type, defaulting to `png`.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}
