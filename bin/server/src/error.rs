//! Error types for the chat endpoint.
//!
//! [`ChatError`] classifies why a request failed; [`ApiError`] is its HTTP
//! rendering. Only the fixed public message reaches the client unless the
//! server runs in debug mode.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Request-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The client exhausted its request window.
    RateLimited,
    /// The message is absent, blank, or the body is not valid JSON.
    MessageRequired,
    /// The message exceeds [`MAX_MESSAGE_CHARS`].
    MessageTooLong { chars: usize },
    /// The language code is not supported.
    InvalidLanguage { code: String },
    /// The body exceeds the configured size limit.
    PayloadTooLarge,
    /// The model call failed.
    Generation,
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::MessageRequired => write!(f, "message is missing or blank"),
            Self::MessageTooLong { chars } => {
                write!(f, "message has {chars} characters, limit is {MAX_MESSAGE_CHARS}")
            }
            Self::InvalidLanguage { code } => write!(f, "unsupported language '{code}'"),
            Self::PayloadTooLarge => write!(f, "request body too large"),
            Self::Generation => write!(f, "response generation failed"),
        }
    }
}

impl std::error::Error for ChatError {}

impl ChatError {
    /// Returns the HTTP status for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::MessageRequired | Self::MessageTooLong { .. } | Self::InvalidLanguage { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Generation => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message shown to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::MessageRequired => "Message is required",
            Self::MessageTooLong { .. } => "Message too long. Maximum 2000 characters.",
            Self::InvalidLanguage { .. } => "Invalid language",
            Self::PayloadTooLarge => "Request body too large.",
            Self::Generation => "Internal server error. Please try again later.",
        }
    }
}

/// An error response: `{ success: false, error, timestamp, details? }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    /// Attaches diagnostic text, kept only when `debug` is set.
    #[must_use]
    pub fn with_details(mut self, debug: bool, details: impl fmt::Display) -> Self {
        if debug {
            self.details = Some(details.to_string());
        }
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self {
            status: err.status(),
            message: err.public_message(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
            timestamp: Utc::now(),
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
