//! LLM backend abstraction.
//!
//! Provides a unified interface over generative model providers so the chat
//! pipeline can be exercised against an in-process fake.

use crate::error::LlmError;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// MIME type assumed for every uploaded image.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// A base64-encoded image sent inline with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// MIME type of the decoded bytes.
    pub mime_type: String,
    /// Base64 payload, without the data-URL prefix.
    pub data: String,
}

impl InlineImage {
    /// Extracts the payload after the first comma of a data URL
    /// (`data:image/png;base64,AAAA...`). The declared media type is ignored
    /// and the image is treated as JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidImage`] if there is no comma, the payload is
    /// empty, or the payload is not valid base64.
    pub fn from_data_url(data_url: &str) -> Result<Self, LlmError> {
        let (_, payload) = data_url
            .split_once(',')
            .ok_or_else(|| LlmError::InvalidImage {
                reason: "expected a data URL with a comma before the payload".to_string(),
            })?;
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(LlmError::InvalidImage {
                reason: "empty image payload".to_string(),
            });
        }
        STANDARD
            .decode(payload)
            .map_err(|e| LlmError::InvalidImage {
                reason: e.to_string(),
            })?;

        Ok(Self {
            mime_type: IMAGE_MIME_TYPE.to_string(),
            data: payload.to_string(),
        })
    }
}

/// A request to an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Optional image; requests with an image go to the vision model.
    pub image: Option<InlineImage>,
}

impl LlmRequest {
    /// Creates a new simple request with just a prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    /// Attaches an image.
    #[must_use]
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Returns true if the request carries an image.
    #[must_use]
    pub fn is_vision(&self) -> bool {
        self.image.is_some()
    }
}

/// A response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

/// Trait for LLM backends.
///
/// This trait defines the interface that all LLM providers must implement.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates a response for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unavailable, the call fails or
    /// times out, or the response cannot be parsed.
    async fn generate(&self, request: &LlmRequest) -> krishi_core::Result<LlmResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_is_not_vision() {
        let request = LlmRequest::new("How do I control aphids?");

        assert_eq!(request.prompt, "How do I control aphids?");
        assert!(!request.is_vision());
    }

    #[test]
    fn data_url_payload_is_extracted() {
        let image = InlineImage::from_data_url("data:image/png;base64,aGVsbG8=").expect("valid");

        assert_eq!(image.data, "aGVsbG8=");
        assert_eq!(image.mime_type, IMAGE_MIME_TYPE);
        assert!(LlmRequest::new("look").with_image(image).is_vision());
    }

    #[test]
    fn data_url_without_comma_is_rejected() {
        let err = InlineImage::from_data_url("aGVsbG8=").unwrap_err();
        assert!(matches!(err, LlmError::InvalidImage { .. }));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(InlineImage::from_data_url("data:image/jpeg;base64,@@@").is_err());
        assert!(InlineImage::from_data_url("data:image/jpeg;base64,").is_err());
    }
}
