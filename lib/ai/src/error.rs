//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: Low-level LLM backend operations, including image payload
//!   decoding for vision calls

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider is unavailable (for example, no API key configured).
    ProviderUnavailable { provider: String, reason: String },
    /// Request failed.
    RequestFailed { reason: String },
    /// Provider answered with a non-success status.
    UpstreamStatus { status: u16, body: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout { seconds: u64 },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Image payload could not be used.
    InvalidImage { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::UpstreamStatus { status, body } => {
                write!(f, "LLM provider returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout { seconds } => write!(f, "LLM request timed out after {seconds}s"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidImage { reason } => {
                write!(f, "invalid image payload: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_display() {
        let err = LlmError::ProviderUnavailable {
            provider: "gemini".to_string(),
            reason: "GEMINI_API_KEY is not set".to_string(),
        };
        assert!(err.to_string().contains("gemini"));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn rate_limited_display_with_and_without_hint() {
        let with_hint = LlmError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(with_hint.to_string().contains("30s"));

        let without = LlmError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(without.to_string(), "rate limited");
    }
}
