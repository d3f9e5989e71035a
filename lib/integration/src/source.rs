//! The auxiliary data source abstraction.
//!
//! Each source turns a [`SourceQuery`] into one block of text, formatted in
//! the query's language, ready to be placed in a model prompt.

use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use krishi_core::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The auxiliary data sources consulted per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Weather,
    Market,
    Knowledge,
    Seasonal,
}

impl DataSourceKind {
    /// All kinds, in prompt order.
    pub const ALL: [Self; 4] = [Self::Weather, Self::Market, Self::Knowledge, Self::Seasonal];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Market => "market",
            Self::Knowledge => "knowledge",
            Self::Seasonal => "seasonal",
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a source lookup.
#[derive(Debug, Clone)]
pub struct SourceQuery {
    /// Language the block is formatted in.
    pub language: Language,
    /// The raw user message, used as the knowledge search text.
    pub message: String,
    /// Place name extracted from the message.
    pub location: Option<String>,
    /// Canonical commodity name extracted from the message.
    pub commodity: Option<String>,
    /// Time of the request; the seasonal calendar reads its month.
    pub requested_at: DateTime<Utc>,
}

impl SourceQuery {
    /// Creates a query for `message` at the current time.
    #[must_use]
    pub fn new(language: Language, message: impl Into<String>) -> Self {
        Self {
            language,
            message: message.into(),
            location: None,
            commodity: None,
            requested_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_commodity(mut self, commodity: Option<String>) -> Self {
        self.commodity = commodity;
        self
    }

    #[must_use]
    pub fn at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }
}

/// A provider of one kind of auxiliary data.
#[async_trait]
pub trait AuxiliarySource: Send + Sync {
    /// Returns which kind of data this source provides.
    fn kind(&self) -> DataSourceKind;

    /// Fetches data for `query` and formats it as a prompt block.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not configured, lacks a parameter,
    /// the upstream call fails, or nothing relevant was found.
    async fn fetch_block(&self, query: &SourceQuery) -> krishi_core::Result<String, SourceError>;
}
