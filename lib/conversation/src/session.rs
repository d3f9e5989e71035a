//! Per-session conversation context.
//!
//! A session's transcript always starts with the system turn for the
//! language it was created in. Appends beyond the turn bound drop the oldest
//! non-system turns, keeping the system turn plus the most recent
//! `max_turns - 1` turns.

use crate::message::ChatTurn;
use crate::system_prompt::system_prompt;
use chrono::{DateTime, Utc};
use krishi_core::Language;
use serde::Serialize;

/// Default upper bound on transcript length, system turn included.
pub const MAX_CONTEXT_TURNS: usize = 10;

/// A conversation transcript keyed by a caller-supplied session identifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Caller-supplied session identifier.
    pub session_id: String,
    /// Language fixed at creation.
    pub language: Language,
    transcript: Vec<ChatTurn>,
    max_turns: usize,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a turn was last appended.
    pub last_active_at: DateTime<Utc>,
}

impl SessionContext {
    /// Creates a session whose transcript holds only the system turn.
    ///
    /// `max_turns` is clamped to at least 2 so a user turn always fits next
    /// to the system turn.
    #[must_use]
    pub fn new(session_id: impl Into<String>, language: Language, max_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            language,
            transcript: vec![ChatTurn::system(system_prompt(language))],
            max_turns: max_turns.max(2),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Appends a turn and applies the truncation policy.
    pub fn append(&mut self, turn: ChatTurn) {
        self.transcript.push(turn);
        if self.transcript.len() > self.max_turns {
            let excess = self.transcript.len() - self.max_turns;
            self.transcript.drain(1..=excess);
        }
        self.last_active_at = Utc::now();
    }

    /// Returns the full transcript, system turn first.
    #[must_use]
    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Returns the leading system turn.
    #[must_use]
    pub fn system_turn(&self) -> &ChatTurn {
        &self.transcript[0]
    }

    /// Returns every turn after the system turn.
    #[must_use]
    pub fn conversation_turns(&self) -> &[ChatTurn] {
        &self.transcript[1..]
    }

    /// Returns the transcript length, system turn included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    /// A transcript is never empty; it always carries the system turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the configured turn bound.
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TurnRole;

    #[test]
    fn new_session_holds_only_system_turn() {
        for language in Language::ALL {
            let session = SessionContext::new("s1", language, MAX_CONTEXT_TURNS);
            assert_eq!(session.len(), 1);
            assert_eq!(session.system_turn().role, TurnRole::System);
            assert_eq!(session.system_turn().content, system_prompt(language));
        }
    }

    #[test]
    fn append_within_bound_keeps_everything() {
        let mut session = SessionContext::new("s1", Language::En, MAX_CONTEXT_TURNS);
        session.append(ChatTurn::user("hello"));
        session.append(ChatTurn::assistant("namaste"));

        assert_eq!(session.len(), 3);
        assert_eq!(session.conversation_turns()[0].content, "hello");
        assert_eq!(session.conversation_turns()[1].content, "namaste");
    }

    #[test]
    fn overflow_keeps_system_turn_and_latest_turns() {
        let mut session = SessionContext::new("s1", Language::Hi, MAX_CONTEXT_TURNS);
        let original_system = session.system_turn().clone();

        for i in 0..25 {
            session.append(ChatTurn::user(format!("turn {i}")));
        }

        assert_eq!(session.len(), MAX_CONTEXT_TURNS);
        assert_eq!(session.system_turn(), &original_system);
        let kept: Vec<_> = session
            .conversation_turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        let expected: Vec<String> = (16..25).map(|i| format!("turn {i}")).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn exactly_at_bound_is_not_truncated() {
        let mut session = SessionContext::new("s1", Language::En, MAX_CONTEXT_TURNS);
        for i in 0..MAX_CONTEXT_TURNS - 1 {
            session.append(ChatTurn::user(format!("turn {i}")));
        }
        assert_eq!(session.len(), MAX_CONTEXT_TURNS);
        assert_eq!(session.conversation_turns()[0].content, "turn 0");
    }

    #[test]
    fn tiny_bound_is_clamped() {
        let mut session = SessionContext::new("s1", Language::En, 0);
        session.append(ChatTurn::user("a"));
        session.append(ChatTurn::user("b"));

        assert_eq!(session.max_turns(), 2);
        assert_eq!(session.len(), 2);
        assert!(session.transcript()[0].is_system());
        assert_eq!(session.transcript()[1].content, "b");
    }

    #[test]
    fn serialized_session_leads_with_system_turn() {
        let mut session = SessionContext::new("s1", Language::Kn, MAX_CONTEXT_TURNS);
        for i in 0..12 {
            session.append(ChatTurn::user(format!("turn {i}")));
        }

        let json = serde_json::to_value(&session).expect("serialize");
        let transcript = json["transcript"].as_array().expect("transcript");

        assert_eq!(json["sessionId"], "s1");
        assert_eq!(transcript.len(), MAX_CONTEXT_TURNS);
        assert_eq!(transcript[0]["role"], "system");
    }
}
