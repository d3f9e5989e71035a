//! Conversation context for the Krishi Officer backend.
//!
//! This crate provides:
//!
//! - **Turns**: role-tagged transcript entries
//! - **Session context**: a per-session transcript bounded to a fixed number
//!   of turns, always led by the language's system turn
//! - **Session store**: lazily created sessions with per-session exclusive
//!   leases and idle eviction

pub mod error;
pub mod message;
pub mod session;
pub mod store;
pub mod system_prompt;

pub use error::SessionError;
pub use message::{ChatTurn, TurnRole};
pub use session::{MAX_CONTEXT_TURNS, SessionContext};
pub use store::{InMemorySessionStore, SessionLease, SessionStore};
pub use system_prompt::system_prompt;
