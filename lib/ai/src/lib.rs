//! AI primitives for the Krishi Officer backend.
//!
//! This crate provides:
//!
//! - **LLM backend**: single-shot text generation, optionally with an inline
//!   image for vision analysis
//! - **Gemini backend**: the HTTP client for Google's generative language API
//! - **Prompt assembly**: one deterministic text prompt built from the
//!   session transcript and auxiliary data blocks

pub mod backend;
pub mod error;
pub mod gemini;
pub mod prompt;

pub use backend::{InlineImage, LlmBackend, LlmRequest, LlmResponse, TokenUsage};
pub use error::LlmError;
pub use gemini::{GeminiBackend, GeminiConfig};
pub use prompt::{AuxiliaryBlocks, PromptAssembler};
