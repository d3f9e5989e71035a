//! In-process fakes for handler tests.

use crate::rate_limit::FixedWindowRateLimiter;
use crate::state::{AppState, ChatSettings};
use async_trait::async_trait;
use krishi_ai::{LlmBackend, LlmError, LlmRequest, LlmResponse, TokenUsage};
use krishi_conversation::InMemorySessionStore;
use krishi_integration::{AuxiliarySource, DataSourceKind, SourceError, SourceQuery};
use rootcause::Report;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const VISION_REPLY: &str = "Leaf blight is visible on the lower leaves.";

/// Answers every text request with a fixed reply and records what it saw.
#[derive(Default)]
pub(crate) struct FakeLlm {
    reply: String,
    fail_text: bool,
    fail_vision: bool,
    pub(crate) requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_failing_vision(mut self) -> Self {
        self.fail_vision = true;
        self
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_vision())
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl LlmBackend for FakeLlm {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
        self.requests.lock().unwrap().push(request.clone());
        let (fail, content) = if request.is_vision() {
            (self.fail_vision, VISION_REPLY.to_string())
        } else {
            (self.fail_text, self.reply.clone())
        };
        if fail {
            return Err(LlmError::RequestFailed {
                reason: "connection reset".to_string(),
            }
            .into());
        }
        Ok(LlmResponse {
            content,
            usage: TokenUsage::default(),
            model: "fake".to_string(),
        })
    }
}

/// Returns a canned block (or no data) and counts its calls.
pub(crate) struct FakeSource {
    kind: DataSourceKind,
    block: Option<String>,
    delay: Option<Duration>,
    pub(crate) calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn returning(kind: DataSourceKind, block: &str) -> Self {
        Self {
            kind,
            block: Some(block.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn empty(kind: DataSourceKind) -> Self {
        Self {
            kind,
            block: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuxiliarySource for FakeSource {
    fn kind(&self) -> DataSourceKind {
        self.kind
    }

    async fn fetch_block(&self, _query: &SourceQuery) -> Result<String, Report<SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.block
            .clone()
            .ok_or_else(|| SourceError::NoData { source: self.kind }.into())
    }
}

/// State with fresh in-memory stores, `llm`, and no auxiliary sources.
pub(crate) fn state_with(llm: Arc<FakeLlm>) -> AppState {
    AppState::new(
        Arc::new(InMemorySessionStore::default()),
        Arc::new(FixedWindowRateLimiter::default()),
        llm,
    )
    .with_settings(ChatSettings {
        source_timeout: Duration::from_millis(200),
        llm_timeout: Duration::from_secs(5),
        debug: false,
    })
}
