//! Session storage.
//!
//! Sessions are created lazily on first use and live until evicted for
//! inactivity. Each session sits behind its own async mutex; a
//! [`SessionLease`] is exclusive access to one session, and leases on the
//! same session are granted in the order they were requested.

use crate::error::SessionError;
use crate::message::ChatTurn;
use crate::session::{MAX_CONTEXT_TURNS, SessionContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use krishi_core::Language;
use rootcause::Report;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type SessionHandle = Arc<Mutex<SessionContext>>;

/// Exclusive access to one session for the duration of a request.
pub struct SessionLease {
    guard: OwnedMutexGuard<SessionContext>,
    created: bool,
}

impl SessionLease {
    /// Returns true if this lease's acquisition created the session.
    #[must_use]
    pub fn was_created(&self) -> bool {
        self.created
    }
}

impl Deref for SessionLease {
    type Target = SessionContext;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Trait for session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns a snapshot of the session, creating it with `language` if the
    /// id is unknown. An existing session keeps the language it was created
    /// with.
    async fn get_or_create(&self, session_id: &str, language: Language) -> SessionContext;

    /// Like [`get_or_create`](Self::get_or_create), but waits for and
    /// returns exclusive access to the live session.
    async fn acquire(&self, session_id: &str, language: Language) -> SessionLease;

    /// Appends a turn to an existing session and returns the resulting
    /// transcript length.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the session was never created.
    async fn append(&self, session_id: &str, turn: ChatTurn) -> krishi_core::Result<usize, SessionError>;

    /// Returns a snapshot of the session, if it exists.
    async fn get(&self, session_id: &str) -> Option<SessionContext>;

    /// Drops sessions whose last activity is before `cutoff`. Sessions that
    /// are leased or awaited are kept. Returns the number removed.
    fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize;

    /// Returns the number of live sessions.
    fn len(&self) -> usize;

    /// Returns true if no sessions are live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local session store.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    max_turns: usize,
}

impl InMemorySessionStore {
    /// Creates an empty store whose sessions hold at most `max_turns` turns.
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    fn handle(&self, session_id: &str, language: Language) -> (SessionHandle, bool) {
        if let Some(handle) = self.existing(session_id) {
            return (handle, false);
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let mut created = false;
        let handle = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(Mutex::new(SessionContext::new(
                    session_id,
                    language,
                    self.max_turns,
                )))
            })
            .clone();
        if created {
            debug!(session_id, %language, "Created conversation session");
        }
        (handle, created)
    }

    fn existing(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(MAX_CONTEXT_TURNS)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: &str, language: Language) -> SessionContext {
        let (handle, _) = self.handle(session_id, language);
        let session = handle.lock().await;
        session.clone()
    }

    async fn acquire(&self, session_id: &str, language: Language) -> SessionLease {
        let (handle, created) = self.handle(session_id, language);
        SessionLease {
            guard: handle.lock_owned().await,
            created,
        }
    }

    async fn append(
        &self,
        session_id: &str,
        turn: ChatTurn,
    ) -> Result<usize, Report<SessionError>> {
        let handle = self.existing(session_id).ok_or_else(|| SessionError::NotFound {
            session_id: session_id.to_string(),
        })?;
        let mut session = handle.lock().await;
        session.append(turn);
        Ok(session.len())
    }

    async fn get(&self, session_id: &str) -> Option<SessionContext> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(session) => session.last_active_at >= cutoff,
                Err(_) => true,
            }
        });
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
