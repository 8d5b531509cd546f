//! [`ImageGenerator`] backed by the Gemini `generateContent` REST endpoint.
//!
//! One request carries the prompt text, the reference photo and any product
//! close-ups as inline data; the response is expected to contain an inline
//! image part.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{GeneratedImage, GenerationRequest, GeneratorError, ImageGenerator};

/// Default model used for image generation.
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini connection settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeneratorConfig {
    /// Load generator settings from environment variables.
    ///
    /// | Env Var                  | Required | Default                                     |
    /// |--------------------------|----------|---------------------------------------------|
    /// | `GEMINI_API_KEY`         | **yes**  | --                                          |
    /// | `GEMINI_MODEL`           | no       | `gemini-2.5-flash-image`                    |
    /// | `GEMINI_BASE_URL`        | no       | `https://generativelanguage.googleapis.com` |
    /// | `GENERATOR_TIMEOUT_SECS` | no       | `120`                                       |
    ///
    /// # Panics
    ///
    /// Panics if `GEMINI_API_KEY` is missing or the timeout is not a valid u64.
    pub fn from_env() -> Self {
        let api_key =
            std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set in the environment");
        assert!(!api_key.is_empty(), "GEMINI_API_KEY must not be empty");

        let timeout_secs: u64 = std::env::var("GENERATOR_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("GENERATOR_TIMEOUT_SECS must be a valid u64");

        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs,
        }
    }
}

/// HTTP client for the Gemini image model.
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl GeminiImageGenerator {
    /// Build a client whose requests time out after `config.timeout_secs`.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or turn it into
    /// [`GeneratorError::Api`] carrying the body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GeneratorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GeneratorError> {
        let mut parts = vec![RequestPart::Text {
            text: &request.prompt,
        }];
        parts.extend(
            std::iter::once(&request.reference_image)
                .chain(&request.product_images)
                .map(|image| RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: STANDARD.encode(&image.bytes),
                    },
                }),
        );

        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: &["TEXT", "IMAGE"],
            },
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            reference_bytes = request.reference_image.bytes.len(),
            product_images = request.product_images.len(),
            "Requesting image generation",
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let parsed: GenerateContentResponse = response.json().await?;
        extract_image(parsed)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl std::fmt::Debug for InlineData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineData")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Pull the first inline image out of a response.
///
/// A prompt-level block reason or a non-`STOP` finish reason without an
/// image is reported as [`GeneratorError::Blocked`]; any text the model
/// returned instead of an image ends up in [`GeneratorError::NoImage`].
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, GeneratorError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GeneratorError::Blocked(reason));
    }

    let mut text = None;
    let mut finish_reason = None;
    for candidate in response.candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let bytes = STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| GeneratorError::Decode(e.to_string()))?;
                if bytes.is_empty() {
                    return Err(GeneratorError::Decode("empty image payload".into()));
                }
                return Ok(GeneratedImage {
                    bytes,
                    content_type: inline.mime_type,
                });
            }
            if text.is_none() {
                text = part.text.filter(|t| !t.trim().is_empty());
            }
        }
    }

    match finish_reason {
        Some(reason) if reason != "STOP" => Err(GeneratorError::Blocked(reason)),
        _ => Err(GeneratorError::NoImage(text)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(json: serde_json::Value) -> Result<GeneratedImage, GeneratorError> {
        extract_image(serde_json::from_value(json).unwrap())
    }

    #[test]
    fn inline_image_is_decoded() {
        let data = STANDARD.encode([0x89, b'P', b'N', b'G']);
        let image = parse(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here is your collage." },
                    { "inlineData": { "mimeType": "image/png", "data": data } }
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(image.content_type, "image/png");
    }

    #[test]
    fn snake_case_inline_data_is_accepted() {
        let data = STANDARD.encode([1, 2, 3]);
        let image = parse(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "inline_data": { "mime_type": "image/jpeg", "data": data } }
                ]}
            }]
        }))
        .unwrap();
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[test]
    fn prompt_block_reason_is_reported() {
        let result = parse(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }));
        assert_matches!(result, Err(GeneratorError::Blocked(reason)) if reason == "SAFETY");
    }

    #[test]
    fn text_only_answer_is_no_image() {
        let result = parse(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot draw that." }] },
                "finishReason": "STOP"
            }]
        }));
        assert_matches!(
            result,
            Err(GeneratorError::NoImage(Some(text))) if text == "I cannot draw that."
        );
    }

    #[test]
    fn abnormal_finish_without_image_is_blocked() {
        let result = parse(serde_json::json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        }));
        assert_matches!(result, Err(GeneratorError::Blocked(reason)) if reason == "IMAGE_SAFETY");
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let result = parse(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "not base64!!" } }
                ]}
            }]
        }));
        assert_matches!(result, Err(GeneratorError::Decode(_)));
    }

    #[test]
    fn empty_response_is_no_image() {
        assert_matches!(parse(serde_json::json!({})), Err(GeneratorError::NoImage(None)));
    }

    #[test]
    fn request_body_uses_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: "prompt" },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".into(),
                            data: "AAAA".into(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: &["TEXT", "IMAGE"],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }
}
