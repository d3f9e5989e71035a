//! Periodic eviction of idle sessions and closed rate limit windows.

use crate::state::AppState;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Counts from one cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupReport {
    pub sessions_evicted: usize,
    pub rate_windows_evicted: usize,
}

/// Evicts sessions idle for longer than `idle_ttl` and rate limit windows
/// that closed before `now`.
pub fn run_cleanup(state: &AppState, now: DateTime<Utc>, idle_ttl: Duration) -> CleanupReport {
    CleanupReport {
        sessions_evicted: state.sessions.evict_idle(now - idle_ttl),
        rate_windows_evicted: state.rate_limiter.evict_expired(now),
    }
}

/// Spawns the cleanup loop, running every `every`.
pub fn spawn_cleanup(
    state: Arc<AppState>,
    every: std::time::Duration,
    idle_ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let report = run_cleanup(&state, Utc::now(), idle_ttl);
            if report != CleanupReport::default() {
                debug!(
                    sessions = report.sessions_evicted,
                    rate_windows = report.rate_windows_evicted,
                    "Periodic cleanup"
                );
            }
        }
    })
}
