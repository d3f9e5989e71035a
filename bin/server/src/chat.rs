//! The chat request pipeline.
//!
//! One request moves through rate limiting, validation, session lookup, data
//! need detection, auxiliary fetches, prompt assembly and the model call.
//! The session lease is held from the user turn's append until the assistant
//! turn's append, so turns on one session land in arrival order.

use crate::error::{ApiError, ChatError, MAX_MESSAGE_CHARS};
use crate::rate_limit::RateLimitResult;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use krishi_ai::{AuxiliaryBlocks, InlineImage, LlmError, LlmRequest, LlmResponse};
use krishi_conversation::ChatTurn;
use krishi_core::{ConversationSessionId, Language, RequestId};
use krishi_integration::{DataNeeds, DataSourceKind, SourceError, SourceQuery};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{Span, debug, error, info, instrument, warn};

/// Substituted for the image analysis when the vision call fails.
pub const IMAGE_ANALYSIS_UNAVAILABLE: &str =
    "Image analysis temporarily unavailable. Please try again later.";

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub language: Option<String>,
    /// Base64 data URL.
    pub image: Option<String>,
    pub session_id: Option<String>,
}

/// Which auxiliary sources contributed a block to the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataSourcesUsed {
    pub weather: bool,
    pub market: bool,
    pub knowledge: bool,
    pub seasonal: bool,
}

impl From<&AuxiliaryBlocks> for DataSourcesUsed {
    fn from(blocks: &AuxiliaryBlocks) -> Self {
        Self {
            weather: blocks.weather.is_some(),
            market: blocks.market.is_some(),
            knowledge: blocks.knowledge.is_some(),
            seasonal: blocks.seasonal.is_some(),
        }
    }
}

/// Successful reply to `POST /chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub image_analysis: Option<String>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub request_id: RequestId,
    pub context_length: usize,
    pub data_sources: DataSourcesUsed,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChat {
    pub message: String,
    pub language: Language,
    pub image: Option<String>,
    pub session_id: String,
}

/// Checks the request in order: message present, message length, language.
///
/// A missing or empty language means English. A missing session id is
/// replaced by a fresh one.
///
/// # Errors
///
/// Returns the first rule the request breaks.
pub fn validate(request: ChatRequest) -> Result<ValidatedChat, ChatError> {
    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or(ChatError::MessageRequired)?;

    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong { chars });
    }

    let language = match request.language.as_deref() {
        None | Some("") => Language::default(),
        Some(code) => code.parse().map_err(|_| ChatError::InvalidLanguage {
            code: code.to_string(),
        })?,
    };

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ConversationSessionId::new().to_string());

    Ok(ValidatedChat {
        message,
        language,
        image: request.image.filter(|image| !image.is_empty()),
        session_id,
    })
}

/// Runs one chat request for the client identified by `client_key`.
///
/// `request` is the decoded body, or the reason it could not be decoded;
/// decoding failures are reported only after the rate limit check.
///
/// # Errors
///
/// Returns a rate limit, validation or internal error response.
#[instrument(
    skip_all,
    fields(request_id = tracing::field::Empty, session_id = tracing::field::Empty)
)]
pub async fn handle_chat(
    state: &AppState,
    client_key: &str,
    request: Result<ChatRequest, ChatError>,
) -> Result<ChatResponse, ApiError> {
    let request_id = RequestId::new();
    let span = Span::current();
    span.record("request_id", tracing::field::display(&request_id));

    if let RateLimitResult::Exceeded { retry_after, .. } =
        state.rate_limiter.check_and_record(client_key)
    {
        info!(
            client = client_key,
            retry_after_secs = retry_after.num_seconds(),
            "Rate limit exceeded"
        );
        return Err(ChatError::RateLimited.into());
    }

    let chat = request.and_then(validate).inspect_err(|err| {
        debug!(error = %err, "Rejected chat request");
    })?;
    span.record("session_id", chat.session_id.as_str());

    let mut lease = state.sessions.acquire(&chat.session_id, chat.language).await;
    let language = lease.language;
    if lease.was_created() {
        debug!(%language, "Created session");
    }
    lease.append(ChatTurn::user(chat.message.as_str()));

    let needs = state.detector.detect(&chat.message);
    let query = SourceQuery::new(language, chat.message.as_str())
        .with_location(needs.location.clone())
        .with_commodity(needs.commodity.clone());
    let blocks = fetch_auxiliary(state, &needs, &query).await;
    let data_sources = DataSourcesUsed::from(&blocks);

    let text_request = LlmRequest::new(state.assembler.assemble(lease.transcript(), &blocks));
    let (reply, image_analysis) = tokio::join!(
        generate(state, &text_request),
        analyze_image(state, chat.image.as_deref(), language),
    );
    let reply = reply.map_err(|report| {
        error!(error = %report, "Response generation failed");
        ApiError::from(ChatError::Generation).with_details(state.settings.debug, &report)
    })?;

    lease.append(ChatTurn::assistant(reply.content.as_str()));
    let context_length = lease.len();
    drop(lease);

    info!(context_length, ?data_sources, "Chat response generated");
    Ok(ChatResponse {
        success: true,
        response: reply.content,
        image_analysis,
        session_id: chat.session_id,
        timestamp: Utc::now(),
        request_id,
        context_length,
        data_sources,
    })
}

/// Fetches every needed source concurrently. Failed sources are left out.
async fn fetch_auxiliary(state: &AppState, needs: &DataNeeds, query: &SourceQuery) -> AuxiliaryBlocks {
    let (weather, market, knowledge, seasonal) = tokio::join!(
        fetch_block(state, needs, query, DataSourceKind::Weather),
        fetch_block(state, needs, query, DataSourceKind::Market),
        fetch_block(state, needs, query, DataSourceKind::Knowledge),
        fetch_block(state, needs, query, DataSourceKind::Seasonal),
    );
    AuxiliaryBlocks {
        weather,
        market,
        knowledge,
        seasonal,
    }
}

/// Names the query parameter `kind` needs but the message did not provide.
fn missing_parameter(kind: DataSourceKind, query: &SourceQuery) -> Option<&'static str> {
    match kind {
        DataSourceKind::Weather if query.location.is_none() => Some("location"),
        DataSourceKind::Market if query.commodity.is_none() => Some("commodity"),
        DataSourceKind::Market if query.location.is_none() => Some("location"),
        _ => None,
    }
}

async fn fetch_block(
    state: &AppState,
    needs: &DataNeeds,
    query: &SourceQuery,
    kind: DataSourceKind,
) -> Option<String> {
    if !needs.wants(kind) {
        return None;
    }
    if let Some(parameter) = missing_parameter(kind, query) {
        debug!(source = %kind, parameter, "Skipping source");
        return None;
    }
    let Some(source) = state.source(kind) else {
        debug!(source = %kind, "No source registered");
        return None;
    };

    let limit = state.settings.source_timeout;
    match timeout(limit, source.fetch_block(query)).await {
        Ok(Ok(block)) if !block.trim().is_empty() => Some(block),
        Ok(Ok(_)) => None,
        Ok(Err(report)) => {
            warn!(source = %kind, error = %report, "Auxiliary fetch failed");
            None
        }
        Err(_) => {
            let err = SourceError::Timeout {
                seconds: limit.as_secs(),
            };
            warn!(source = %kind, error = %err, "Auxiliary fetch failed");
            None
        }
    }
}

async fn generate(state: &AppState, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
    let limit = state.settings.llm_timeout;
    match timeout(limit, state.llm.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout {
            seconds: limit.as_secs(),
        }
        .into()),
    }
}

fn vision_prompt(language: Language) -> String {
    format!(
        "Analyze this crop/plant image and provide detailed agricultural advice in {}",
        language.english_name()
    )
}

/// Runs the vision call if an image was sent. Failures yield the
/// unavailable notice.
async fn analyze_image(state: &AppState, image: Option<&str>, language: Language) -> Option<String> {
    let image = image?;
    let inline = match InlineImage::from_data_url(image) {
        Ok(inline) => inline,
        Err(err) => {
            warn!(error = %err, "Unusable image payload");
            return Some(IMAGE_ANALYSIS_UNAVAILABLE.to_string());
        }
    };

    let request = LlmRequest::new(vision_prompt(language)).with_image(inline);
    match generate(state, &request).await {
        Ok(response) => Some(response.content),
        Err(report) => {
            warn!(error = %report, "Image analysis failed");
            Some(IMAGE_ANALYSIS_UNAVAILABLE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLlm, FakeSource, VISION_REPLY, state_with};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: Some(message.to_string()),
            ..ChatRequest::default()
        }
    }

    #[test]
    fn validation_order_and_rules() {
        assert_eq!(
            validate(ChatRequest::default()).unwrap_err(),
            ChatError::MessageRequired
        );
        assert_eq!(validate(request("   ")).unwrap_err(), ChatError::MessageRequired);

        let long = "a".repeat(2001);
        let err = validate(ChatRequest {
            language: Some("fr".to_string()),
            ..request(&long)
        })
        .unwrap_err();
        assert_eq!(err, ChatError::MessageTooLong { chars: 2001 });

        let err = validate(ChatRequest {
            language: Some("fr".to_string()),
            ..request("hello")
        })
        .unwrap_err();
        assert_eq!(
            err,
            ChatError::InvalidLanguage {
                code: "fr".to_string()
            }
        );
    }

    #[test]
    fn length_limit_counts_characters() {
        let hindi = "क".repeat(2000);
        assert!(validate(request(&hindi)).is_ok());
    }

    #[test]
    fn defaults_are_filled_in() {
        let chat = validate(ChatRequest {
            language: Some(String::new()),
            session_id: Some(String::new()),
            image: Some(String::new()),
            ..request("hello")
        })
        .unwrap();

        assert_eq!(chat.language, Language::En);
        assert!(chat.session_id.starts_with("sess_"));
        assert!(chat.image.is_none());
    }

    #[test]
    fn missing_parameters_per_source() {
        let bare = SourceQuery::new(Language::En, "rain");
        assert_eq!(missing_parameter(DataSourceKind::Weather, &bare), Some("location"));
        assert_eq!(missing_parameter(DataSourceKind::Market, &bare), Some("commodity"));
        assert_eq!(missing_parameter(DataSourceKind::Knowledge, &bare), None);

        let rice = bare.clone().with_commodity(Some("Rice".to_string()));
        assert_eq!(missing_parameter(DataSourceKind::Market, &rice), Some("location"));
    }

    #[tokio::test]
    async fn weather_without_location_is_not_fetched() {
        let weather = Arc::new(FakeSource::returning(DataSourceKind::Weather, "Sunny"));
        let state = state_with(Arc::new(FakeLlm::replying("ok"))).with_source(weather.clone());

        let response = handle_chat(&state, "k", Ok(request("Weather forecast tomorrow?")))
            .await
            .unwrap();

        assert_eq!(weather.call_count(), 0);
        assert!(!response.data_sources.weather);
    }

    #[tokio::test]
    async fn market_question_reaches_market_and_prompt() {
        let market = Arc::new(FakeSource::returning(DataSourceKind::Market, "Rice: ₹2300"));
        let llm = Arc::new(FakeLlm::replying("Prices are steady."));
        let state = state_with(llm.clone()).with_source(market.clone());

        let response = handle_chat(
            &state,
            "k",
            Ok(request("What is the market price of Rice in Mysore?")),
        )
        .await
        .unwrap();

        assert_eq!(market.call_count(), 1);
        assert!(response.data_sources.market);
        assert!(llm.prompts()[0].contains("Rice: ₹2300"));
    }

    #[tokio::test]
    async fn failing_and_slow_sources_are_dropped() {
        let knowledge = Arc::new(FakeSource::empty(DataSourceKind::Knowledge));
        let seasonal = Arc::new(
            FakeSource::returning(DataSourceKind::Seasonal, "Sow kharif").slow(Duration::from_secs(5)),
        );
        let state = state_with(Arc::new(FakeLlm::replying("ok")))
            .with_source(knowledge.clone())
            .with_source(seasonal.clone());

        let response = handle_chat(
            &state,
            "k",
            Ok(request("Which crop should I sow this season?")),
        )
        .await
        .unwrap();

        assert_eq!(knowledge.call_count(), 1);
        assert_eq!(seasonal.call_count(), 1);
        assert_eq!(response.data_sources, DataSourcesUsed::default());
        assert_eq!(response.context_length, 3);
    }

    #[tokio::test]
    async fn session_keeps_creation_language() {
        let llm = Arc::new(FakeLlm::replying("ok"));
        let state = state_with(llm.clone());

        let first = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                language: Some("hi".to_string()),
                session_id: Some("farm-1".to_string()),
                ..request("नमस्ते")
            }),
        )
        .await
        .unwrap();
        let second = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                language: Some("en".to_string()),
                session_id: Some("farm-1".to_string()),
                ..request("hello again")
            }),
        )
        .await
        .unwrap();

        assert_eq!(first.context_length, 3);
        assert_eq!(second.context_length, 5);
        let session = state.sessions.get("farm-1").await.unwrap();
        assert_eq!(session.language, Language::Hi);
        let prompts = llm.prompts();
        assert!(prompts[1].starts_with(krishi_conversation::system_prompt(Language::Hi)));
    }

    #[tokio::test]
    async fn model_failure_is_internal_error_and_keeps_user_turn() {
        let state = state_with(Arc::new(FakeLlm::failing()));

        let err = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                session_id: Some("s".to_string()),
                ..request("hello")
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.sessions.get("s").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn image_is_analyzed_in_session_language() {
        let llm = Arc::new(FakeLlm::replying("ok"));
        let state = state_with(llm.clone());

        let response = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                language: Some("kn".to_string()),
                image: Some(PIXEL.to_string()),
                ..request("What is wrong with this leaf?")
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.image_analysis.as_deref(), Some(VISION_REPLY));
        let requests = llm.requests.lock().unwrap();
        let vision = requests.iter().find(|r| r.is_vision()).unwrap();
        assert!(vision.prompt.ends_with("advice in Kannada"));
        assert_eq!(vision.image.as_ref().unwrap().mime_type, "image/jpeg");
        assert_eq!(vision.image.as_ref().unwrap().data, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn vision_failure_becomes_placeholder() {
        let state = state_with(Arc::new(FakeLlm::replying("ok").with_failing_vision()));

        let response = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                image: Some(PIXEL.to_string()),
                ..request("Look at this")
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.response, "ok");
        assert_eq!(
            response.image_analysis.as_deref(),
            Some(IMAGE_ANALYSIS_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn malformed_image_becomes_placeholder() {
        let state = state_with(Arc::new(FakeLlm::replying("ok")));

        let response = handle_chat(
            &state,
            "k",
            Ok(ChatRequest {
                image: Some("not a data url".to_string()),
                ..request("Look at this")
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            response.image_analysis.as_deref(),
            Some(IMAGE_ANALYSIS_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn rate_limit_is_checked_before_validation() {
        let state = state_with(Arc::new(FakeLlm::replying("ok")));
        for _ in 0..20 {
            let _ = handle_chat(&state, "10.0.0.9", Err(ChatError::MessageRequired)).await;
        }

        let err = handle_chat(&state, "10.0.0.9", Ok(request("hello")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = handle_chat(&state, "10.0.0.10", Ok(request("hello"))).await;
        assert!(other.is_ok());
    }
}
