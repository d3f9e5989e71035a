//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested
//! sections use `__` as the separator, e.g. `RATE_LIMIT__MAX_REQUESTS`.

use krishi_ai::GeminiConfig;
use krishi_ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use krishi_conversation::MAX_CONTEXT_TURNS;
use krishi_integration::market::DEFAULT_MARKET_BASE_URL;
use krishi_integration::weather::DEFAULT_WEATHER_BASE_URL;
use krishi_integration::{MarketConfig, WeatherConfig};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Accepted rate limit window lengths: one second to one day.
const WINDOW_SECONDS_RANGE: RangeInclusive<u64> = 1..=86_400;

/// Accepted idle session lifetimes: one minute to thirty days.
const IDLE_TTL_MINUTES_RANGE: RangeInclusive<i64> = 1..=43_200;

/// Accepted cleanup intervals: one second to one day.
const CLEANUP_INTERVAL_SECONDS_RANGE: RangeInclusive<u64> = 1..=86_400;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Include diagnostic details in internal error responses.
    #[serde(default)]
    pub debug: bool,

    /// Maximum request body size. Images arrive inline as base64.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Gemini API key.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// OpenWeatherMap API key.
    #[serde(default)]
    pub openweather_api_key: Option<String>,

    /// data.gov.in API key for mandi prices.
    #[serde(default)]
    pub data_gov_api_key: Option<String>,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Generative model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_model")]
    pub vision_model: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window and client.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Maximum transcript length, system turn included.
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,

    /// Sessions idle for longer than this are evicted.
    #[serde(default = "default_idle_ttl_minutes")]
    pub idle_ttl_minutes: i64,

    /// Interval between cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

/// Auxiliary data source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Upper bound on each auxiliary fetch.
    #[serde(default = "default_source_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    #[serde(default = "default_market_base_url")]
    pub market_base_url: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_llm_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_llm_timeout_seconds() -> u64 {
    30
}

fn default_max_requests() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_max_context_turns() -> usize {
    MAX_CONTEXT_TURNS
}

fn default_idle_ttl_minutes() -> i64 {
    60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_source_timeout_seconds() -> u64 {
    10
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

fn default_market_base_url() -> String {
    DEFAULT_MARKET_BASE_URL.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            vision_model: default_model(),
            base_url: default_llm_base_url(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_context_turns: default_max_context_turns(),
            idle_ttl_minutes: default_idle_ttl_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_source_timeout_seconds(),
            weather_base_url: default_weather_base_url(),
            market_base_url: default_market_base_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            debug: false,
            max_body_bytes: default_max_body_bytes(),
            gemini_api_key: None,
            openweather_api_key: None,
            data_gov_api_key: None,
            llm: LlmConfig::default(),
            rate_limit: RateLimitConfig::default(),
            session: SessionConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed, or
    /// if a value is outside the range [`ServerConfig::validate`] accepts.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_builder(
            config::Config::builder().add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with: zero-length windows and
    /// intervals, and durations too large to represent.
    ///
    /// # Errors
    ///
    /// Returns [`config::ConfigError::Message`] naming the offending key.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        fn check<T>(key: &str, value: T, range: &RangeInclusive<T>) -> Result<(), config::ConfigError>
        where
            T: PartialOrd + std::fmt::Display,
        {
            if range.contains(&value) {
                Ok(())
            } else {
                Err(config::ConfigError::Message(format!(
                    "{key} must be between {} and {}, got {value}",
                    range.start(),
                    range.end()
                )))
            }
        }

        check("rate_limit.max_requests", self.rate_limit.max_requests, &(1..=u32::MAX))?;
        check("rate_limit.window_seconds", self.rate_limit.window_seconds, &WINDOW_SECONDS_RANGE)?;
        check("session.idle_ttl_minutes", self.session.idle_ttl_minutes, &IDLE_TTL_MINUTES_RANGE)?;
        check(
            "session.cleanup_interval_seconds",
            self.session.cleanup_interval_seconds,
            &CLEANUP_INTERVAL_SECONDS_RANGE,
        )?;
        check("sources.timeout_seconds", self.sources.timeout_seconds, &(1..=u64::from(u32::MAX)))?;
        check("llm.timeout_seconds", self.llm.timeout_seconds, &(1..=u64::from(u32::MAX)))?;
        Ok(())
    }

    /// Settings for the Gemini backend.
    #[must_use]
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            vision_model: self.llm.vision_model.clone(),
            timeout_seconds: self.llm.timeout_seconds,
        }
    }

    /// Settings for the weather source.
    #[must_use]
    pub fn weather(&self) -> WeatherConfig {
        WeatherConfig {
            api_key: self.openweather_api_key.clone(),
            base_url: self.sources.weather_base_url.clone(),
        }
    }

    /// Settings for the market source.
    #[must_use]
    pub fn market(&self) -> MarketConfig {
        MarketConfig {
            api_key: self.data_gov_api_key.clone(),
            base_url: self.sources.market_base_url.clone(),
        }
    }

    /// Per-fetch timeout for auxiliary sources.
    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert!(!config.debug);
        assert_eq!(config.max_body_bytes, 10_485_760);
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(config.session.max_context_turns, 10);
        assert_eq!(config.session.idle_ttl_minutes, 60);
        assert_eq!(config.session.cleanup_interval_seconds, 300);
        assert_eq!(config.sources.timeout_seconds, 10);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
    }

    #[test]
    fn empty_source_deserializes_to_defaults() {
        let config = ServerConfig::from_builder(config::Config::builder()).expect("load");
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }

    #[test]
    fn nested_values_override_defaults() {
        let builder = config::Config::builder()
            .set_override("rate_limit.max_requests", 5)
            .expect("override")
            .set_override("debug", true)
            .expect("override")
            .set_override("gemini_api_key", "secret")
            .expect("override");

        let config = ServerConfig::from_builder(builder).expect("load");

        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert!(config.debug);
        assert_eq!(config.gemini().api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn zero_cleanup_interval_is_rejected() {
        let builder = config::Config::builder()
            .set_override("session.cleanup_interval_seconds", 0)
            .expect("override");

        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("session.cleanup_interval_seconds"));
    }

    #[test]
    fn oversized_rate_window_is_rejected() {
        let builder = config::Config::builder()
            .set_override("rate_limit.window_seconds", i64::MAX)
            .expect("override");

        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("rate_limit.window_seconds"));
    }

    #[test]
    fn validate_checks_each_bounded_setting() {
        assert!(ServerConfig::default().validate().is_ok());

        let mut config = ServerConfig::default();
        config.rate_limit.window_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.session.idle_ttl_minutes = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.session.idle_ttl_minutes = 43_200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn library_configs_carry_keys_and_urls() {
        let config = ServerConfig {
            openweather_api_key: Some("weather".to_string()),
            data_gov_api_key: Some("market".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(config.weather().api_key.as_deref(), Some("weather"));
        assert_eq!(config.weather().base_url, DEFAULT_WEATHER_BASE_URL);
        assert_eq!(config.market().api_key.as_deref(), Some("market"));
        assert_eq!(config.source_timeout(), Duration::from_secs(10));
    }
}
