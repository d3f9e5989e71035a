//! Core domain types and utilities for the Krishi Officer backend.
//!
//! This crate provides the foundational types, error handling, and shared
//! utilities used by the conversation, AI, integration and server crates.

pub mod error;
pub mod id;
pub mod language;

pub use error::Result;
pub use id::{ConversationSessionId, ParseIdError, RequestId};
pub use language::{Language, LanguageTable, ParseLanguageError};
