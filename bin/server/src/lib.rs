//! Krishi Officer HTTP service.
//!
//! This crate wires the conversation, AI and integration crates into a
//! single JSON endpoint: `POST /chat` answers a farmer's question using the
//! session transcript plus any weather, market, knowledge or seasonal data
//! the message calls for.

pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod housekeeping;
pub mod rate_limit;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

pub use chat::{ChatRequest, ChatResponse, DataSourcesUsed, handle_chat};
pub use config::ServerConfig;
pub use error::{ApiError, ChatError};
pub use rate_limit::{FixedWindowRateLimiter, RateLimitResult, RateLimiterStore};
pub use routes::router;
pub use state::{AppState, ChatSettings};
