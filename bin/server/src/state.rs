//! Shared application state.

use crate::config::ServerConfig;
use crate::rate_limit::{FixedWindowRateLimiter, RateLimiterStore};
use krishi_ai::{GeminiBackend, LlmBackend, PromptAssembler};
use krishi_conversation::{InMemorySessionStore, SessionStore};
use krishi_integration::{
    AuxiliarySource, DataNeedDetector, DataSourceKind, KeywordDetector, KnowledgeBase,
    MarketSource, SeasonalCalendar, WeatherSource,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Request-handling knobs derived from configuration.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Upper bound on each auxiliary fetch.
    pub source_timeout: Duration,
    /// Upper bound on each model call, on top of the client's own timeout.
    pub llm_timeout: Duration,
    /// Include diagnostics in internal error responses.
    pub debug: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(30),
            debug: false,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub rate_limiter: Arc<dyn RateLimiterStore>,
    pub detector: Arc<dyn DataNeedDetector>,
    pub llm: Arc<dyn LlmBackend>,
    pub assembler: PromptAssembler,
    pub settings: ChatSettings,
    sources: Vec<Arc<dyn AuxiliarySource>>,
}

impl AppState {
    /// Creates state with the keyword detector, default settings and no
    /// auxiliary sources.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        rate_limiter: Arc<dyn RateLimiterStore>,
        llm: Arc<dyn LlmBackend>,
    ) -> Self {
        Self {
            sessions,
            rate_limiter,
            detector: Arc::new(KeywordDetector::default()),
            llm,
            assembler: PromptAssembler::new(),
            settings: ChatSettings::default(),
            sources: Vec::new(),
        }
    }

    /// Builds the production state: in-memory stores, the Gemini backend
    /// and all four auxiliary sources.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let client = Client::new();
        let llm = GeminiBackend::with_client(client.clone(), config.gemini());

        Self::new(
            Arc::new(InMemorySessionStore::new(config.session.max_context_turns)),
            Arc::new(FixedWindowRateLimiter::new(config.rate_limit)),
            Arc::new(llm),
        )
        .with_source(Arc::new(WeatherSource::new(client.clone(), config.weather())))
        .with_source(Arc::new(MarketSource::new(client, config.market())))
        .with_source(Arc::new(KnowledgeBase::builtin()))
        .with_source(Arc::new(SeasonalCalendar::new()))
        .with_settings(ChatSettings {
            source_timeout: config.source_timeout(),
            llm_timeout: Duration::from_secs(config.llm.timeout_seconds),
            debug: config.debug,
        })
    }

    /// Registers an auxiliary source, replacing any source of the same kind.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn AuxiliarySource>) -> Self {
        self.sources.retain(|existing| existing.kind() != source.kind());
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn DataNeedDetector>) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the source registered for `kind`.
    #[must_use]
    pub fn source(&self, kind: DataSourceKind) -> Option<&Arc<dyn AuxiliarySource>> {
        self.sources.iter().find(|source| source.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_state_registers_every_source() {
        let state = AppState::from_config(&ServerConfig::default());
        for kind in DataSourceKind::ALL {
            assert!(state.source(kind).is_some(), "{kind} missing");
        }
        assert_eq!(state.settings.source_timeout, Duration::from_secs(10));
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn with_source_replaces_same_kind() {
        let state = AppState::from_config(&ServerConfig::default())
            .with_source(Arc::new(SeasonalCalendar::new()));
        assert_eq!(state.sources.len(), 4);
    }
}
