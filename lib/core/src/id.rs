//! Server-minted identifiers.
//!
//! Ids are ULIDs rendered with a short type prefix (`req_01J...`), so they
//! sort by creation time and are recognisable in logs. On the wire they are
//! always the prefixed string. Caller-supplied session identifiers are plain
//! strings and never pass through these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when a string is not a valid prefixed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The id type that was expected.
    pub id_type: &'static str,
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident => $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(Ulid);

        impl $name {
            /// Prefix written before the ULID.
            pub const PREFIX: &'static str = $prefix;

            /// Mints a fresh id.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            /// Parses the prefixed form only.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let invalid = |reason: String| ParseIdError {
                    id_type: stringify!($name),
                    reason,
                };
                let body = s
                    .strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .ok_or_else(|| invalid(format!("expected prefix '{}_'", Self::PREFIX)))?;
                Ulid::from_string(body)
                    .map(Self)
                    .map_err(|e| invalid(e.to_string()))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

prefixed_id!(
    /// One chat request, echoed back to the caller as `requestId`.
    RequestId => "req"
);

prefixed_id!(
    /// Identifier minted for a conversation when the caller supplies none.
    ConversationSessionId => "sess"
);
