//! Client for the external image-generation model.
//!
//! The generator is a black box: it receives the compiled prompt and the
//! reference photo, and returns either one image or a failure. Nothing here
//! retries; the caller decides what a failure means.

use async_trait::async_trait;

pub mod gemini;

/// An image sent to the generator as visual input.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`, e.g. `image/jpeg`.
    pub mime_type: String,
}

/// Input for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// The outfit photo the collage is built from.
    pub reference_image: InputImage,
    /// Optional close-ups of individual products, in product order.
    pub product_images: Vec<InputImage>,
}

/// The image returned by the generator.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Errors from an [`ImageGenerator`].
///
/// Display strings are shown to users as the failure detail of a collage.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Image generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Image generation provider error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider refused the request, e.g. on content policy grounds.
    #[error("Image generation was blocked by the provider: {0}")]
    Blocked(String),

    /// The provider answered without an image.
    #[error("Image generation returned no image{}", .0.as_deref().map(|t| format!(": {t}")).unwrap_or_default())]
    NoImage(Option<String>),

    /// The returned image payload could not be decoded.
    #[error("Generated image could not be decoded: {0}")]
    Decode(String),
}

/// External image-generation capability.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GeneratedImage, GeneratorError>;
}
