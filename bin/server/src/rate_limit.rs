//! Per-client request throttling.
//!
//! A fixed window opens on a client's first request and closes
//! `window_seconds` later; the client may make `max_requests` requests inside
//! it. A request arriving exactly at the window's end still counts against
//! it. Bursts of up to twice the limit across a window boundary are allowed.

use crate::config::RateLimitConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        remaining: u32,
        resets_at: DateTime<Utc>,
    },
    /// Rate limit exceeded.
    Exceeded {
        retry_after: Duration,
        resets_at: DateTime<Utc>,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the number of remaining requests (0 if exceeded).
    #[must_use]
    pub fn remaining(&self) -> u32 {
        match self {
            Self::Allowed { remaining, .. } => *remaining,
            Self::Exceeded { .. } => 0,
        }
    }
}

/// Trait for rate limit storage keyed by client.
pub trait RateLimiterStore: Send + Sync {
    /// Records a request from `key` at `now` and reports whether it may
    /// proceed. Denied requests are not counted.
    fn check_and_record_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitResult;

    /// Like [`check_and_record_at`](Self::check_and_record_at) at the
    /// current time.
    fn check_and_record(&self, key: &str) -> RateLimitResult {
        self.check_and_record_at(key, Utc::now())
    }

    /// Drops records whose window ended before `now`. Returns the number
    /// removed.
    fn evict_expired(&self, now: DateTime<Utc>) -> usize;

    /// Returns the number of tracked clients.
    fn len(&self) -> usize;

    /// Returns true if no clients are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    resets_at: DateTime<Utc>,
}

/// In-memory fixed-window rate limiter.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    config: RateLimitConfig,
    windows: RwLock<HashMap<String, WindowState>>,
}

impl FixedWindowRateLimiter {
    /// Creates a new rate limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_seconds as i64)
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiterStore for FixedWindowRateLimiter {
    fn check_and_record_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitResult {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);

        let fresh = WindowState {
            count: 0,
            resets_at: now + self.window(),
        };
        let state = windows.entry(key.to_string()).or_insert_with(|| fresh.clone());
        if now > state.resets_at {
            *state = fresh;
        }

        if state.count >= self.config.max_requests {
            return RateLimitResult::Exceeded {
                retry_after: state.resets_at - now,
                resets_at: state.resets_at,
            };
        }

        state.count += 1;
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - state.count,
            resets_at: state.resets_at,
        }
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, state| now <= state.resets_at);
        before - windows.len()
    }

    fn len(&self) -> usize {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
