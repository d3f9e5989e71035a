//! Google Gemini backend.
//!
//! Talks to the `generateContent` endpoint of the generative language API.
//! Text requests use the configured text model; requests carrying an image
//! use the vision model.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for both text and vision calls.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Connection settings for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key. Without one every call fails with
    /// [`LlmError::ProviderUnavailable`].
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 30,
        }
    }
}

/// HTTP client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Creates a backend using a fresh HTTP client.
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a backend sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    fn model_for(&self, request: &LlmRequest) -> &str {
        if request.is_vision() {
            &self.config.vision_model
        } else {
            &self.config.model
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn call(
        &self,
        api_key: &str,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::from_request(request))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        body.into_llm_response(model)
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
        let api_key = self.api_key().ok_or_else(|| LlmError::ProviderUnavailable {
            provider: "gemini".to_string(),
            reason: "GEMINI_API_KEY is not set".to_string(),
        })?;
        let model = self.model_for(request);
        debug!(
            model,
            vision = request.is_vision(),
            prompt_chars = request.prompt.chars().count(),
            "Calling Gemini"
        );

        let seconds = self.config.timeout_seconds;
        let response = tokio::time::timeout(
            Duration::from_secs(seconds),
            self.call(api_key, model, request),
        )
        .await
        .map_err(|_| LlmError::Timeout { seconds })?;

        match response {
            Ok(response) => {
                debug!(
                    model,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Gemini call completed"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(model, error = %e, "Gemini call failed");
                Err(e.into())
            }
        }
    }
}

// Wire types.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }

        Self {
            contents: vec![Content { parts }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateContentResponse {
    fn into_llm_response(self, model: &str) -> Result<LlmResponse, LlmError> {
        let content: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::ResponseParseFailed {
                reason: "response contained no text".to_string(),
            });
        }

        let usage = self
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: model.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InlineImage;

    fn backend(api_key: Option<&str>) -> GeminiBackend {
        GeminiBackend::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            vision_model: "gemini-vision".to_string(),
            ..GeminiConfig::default()
        })
    }

    #[tokio::test]
    async fn missing_api_key_is_provider_unavailable() {
        let backend = backend(None);
        assert!(!backend.is_configured());

        let err = backend
            .generate(&LlmRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert!(!backend(Some("  ")).is_configured());
        assert!(backend(Some("key")).is_configured());
    }

    #[test]
    fn vision_requests_use_vision_model() {
        let backend = backend(Some("key"));
        let image = InlineImage::from_data_url("data:image/png;base64,aGVsbG8=").expect("image");

        assert_eq!(backend.model_for(&LlmRequest::new("text")), DEFAULT_MODEL);
        assert_eq!(
            backend.model_for(&LlmRequest::new("look").with_image(image)),
            "gemini-vision"
        );
        assert_eq!(
            backend.endpoint("gemini-vision"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-vision:generateContent"
        );
    }

    #[test]
    fn request_body_carries_text_and_inline_image() {
        let image = InlineImage::from_data_url("data:image/png;base64,aGVsbG8=").expect("image");
        let request = LlmRequest::new("Analyze").with_image(image);

        let body = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": "Analyze" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "aGVsbG8=" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn response_text_parts_are_joined() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Use neem " }, { "text": "oil spray." }] }
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 5 }
        }))
        .expect("deserialize");

        let response = body.into_llm_response("gemini-1.5-flash").expect("text");

        assert_eq!(response.content, "Use neem oil spray.");
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 5);
        assert_eq!(response.model, "gemini-1.5-flash");
    }

    #[test]
    fn empty_candidates_fail_to_parse() {
        let body: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).expect("deserialize");

        let err = body.into_llm_response("m").unwrap_err();
        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }
}
