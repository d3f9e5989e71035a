//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `SessionError`: Errors from session store operations

use std::fmt;

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session not found. Appending to a session that was never created is
    /// a caller bug: `get_or_create` or `acquire` must come first.
    NotFound { session_id: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { session_id } => write!(f, "session not found: {session_id}"),
        }
    }
}

impl std::error::Error for SessionError {}
