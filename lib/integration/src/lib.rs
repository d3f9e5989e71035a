//! Auxiliary data for the Krishi Officer backend.
//!
//! This crate provides:
//!
//! - **Data-need detection**: keyword routing from a user message to the
//!   sources worth consulting, with location and commodity extraction
//! - **Auxiliary sources**: weather, mandi prices, the knowledge base and the
//!   seasonal calendar, each producing one prompt-ready text block in the
//!   farmer's language

pub mod detector;
pub mod error;
pub mod knowledge;
pub mod market;
pub mod seasonal;
pub mod source;
mod text;
pub mod weather;

pub use detector::{DataNeedDetector, DataNeeds, KeywordDetector, KeywordTable};
pub use error::SourceError;
pub use knowledge::{KnowledgeBase, KnowledgeCategory, KnowledgeItem, NewKnowledgeItem};
pub use market::{MarketConfig, MarketPrice, MarketSource, POPULAR_COMMODITIES};
pub use seasonal::{MonthPlan, SeasonalCalendar};
pub use source::{AuxiliarySource, DataSourceKind, SourceQuery};
pub use weather::{WeatherConfig, WeatherReport, WeatherSource};
