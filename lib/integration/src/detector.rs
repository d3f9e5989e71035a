//! Data-need detection.
//!
//! Decides, from the raw text of a user message, which auxiliary sources are
//! worth consulting and pulls out the parameters they need. Matching is plain
//! case-insensitive substring search against a [`KeywordTable`]; any hit in a
//! category turns that category on, and categories are independent.

use crate::market::POPULAR_COMMODITIES;
use crate::source::DataSourceKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Preposition followed by a place name. The preposition must start a word,
/// so the tail of "What" or "rain" is never taken for "at" or "in". The
/// capture stops at the first whitespace, punctuation mark, or end of text
/// after at least one letter.
#[allow(clippy::expect_used)]
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|at|near|from)\s+([a-z][a-z\s]*?)(?:\s|$|[,.?!])")
        .expect("valid regex")
});

const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "rain", "temperature", "forecast", "humidity", "wind", "climate", "monsoon",
    "मौसम", "बारिश", "वर्षा", "तापमान",
    "ಹವಾಮಾನ", "ಮಳೆ", "ತಾಪಮಾನ",
    "കാലാവസ്ഥ", "മഴ", "താപനില",
];

const MARKET_KEYWORDS: &[&str] = &[
    "price", "market", "mandi", "rate", "sell", "cost",
    "भाव", "कीमत", "बाजार", "मंडी",
    "ಬೆಲೆ", "ಮಾರುಕಟ್ಟೆ", "ದರ",
    "വില", "വിപണി", "മാർക്കറ്റ്",
];

const KNOWLEDGE_KEYWORDS: &[&str] = &[
    "pest", "disease", "crop", "fertilizer", "soil", "irrigation", "seed", "organic", "fungus",
    "insect", "weed", "yield",
    "कीट", "रोग", "खाद", "मिट्टी", "फसल", "बीज",
    "ಕೀಟ", "ರೋಗ", "ಗೊಬ್ಬರ", "ಮಣ್ಣು", "ಬೆಳೆ",
    "കീട", "രോഗ", "വളം", "മണ്ണ്", "വിള",
];

const SEASONAL_KEYWORDS: &[&str] = &[
    "season", "sow", "planting", "harvest", "calendar", "month", "kharif", "rabi", "zaid",
    "बुवाई", "कटाई", "खरीफ", "रबी",
    "ಬಿತ್ತನೆ", "ಕೊಯ್ಲು", "ಹಂಗಾಮು",
    "വിതയ്ക്ക", "വിളവെടുപ്പ്", "സീസൺ",
];

/// Keyword lists driving detection, versioned so a change in routing
/// behavior is visible as a data change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTable {
    pub version: String,
    pub weather: Vec<String>,
    pub market: Vec<String>,
    pub knowledge: Vec<String>,
    pub seasonal: Vec<String>,
    /// Canonical commodity names, in match priority order.
    pub commodities: Vec<String>,
}

impl KeywordTable {
    /// Version tag of [`KeywordTable::builtin`].
    pub const BUILTIN_VERSION: &'static str = "2024-09.1";

    /// The built-in English, Hindi, Kannada and Malayalam lists.
    #[must_use]
    pub fn builtin() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();
        Self {
            version: Self::BUILTIN_VERSION.to_string(),
            weather: owned(WEATHER_KEYWORDS),
            market: owned(MARKET_KEYWORDS),
            knowledge: owned(KNOWLEDGE_KEYWORDS),
            seasonal: owned(SEASONAL_KEYWORDS),
            commodities: owned(POPULAR_COMMODITIES),
        }
    }

    /// Returns the keyword list for a source.
    #[must_use]
    pub fn keywords(&self, kind: DataSourceKind) -> &[String] {
        match kind {
            DataSourceKind::Weather => &self.weather,
            DataSourceKind::Market => &self.market,
            DataSourceKind::Knowledge => &self.knowledge,
            DataSourceKind::Seasonal => &self.seasonal,
        }
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// What a message asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataNeeds {
    pub weather: bool,
    pub market: bool,
    pub knowledge: bool,
    pub seasonal: bool,
    /// Place name following a preposition, as written in the message.
    pub location: Option<String>,
    /// Canonical name of the first listed commodity found in the message.
    pub commodity: Option<String>,
}

impl DataNeeds {
    /// Returns whether the given source was asked for.
    #[must_use]
    pub fn wants(&self, kind: DataSourceKind) -> bool {
        match kind {
            DataSourceKind::Weather => self.weather,
            DataSourceKind::Market => self.market,
            DataSourceKind::Knowledge => self.knowledge,
            DataSourceKind::Seasonal => self.seasonal,
        }
    }

    /// Returns true if no source was asked for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !DataSourceKind::ALL.iter().any(|kind| self.wants(*kind))
    }
}

/// Strategy for deciding which auxiliary sources a message needs.
pub trait DataNeedDetector: Send + Sync {
    /// Inspects `message` and reports the sources and parameters it needs.
    fn detect(&self, message: &str) -> DataNeeds;
}

/// Substring keyword matcher over a [`KeywordTable`].
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    table: KeywordTable,
    /// `(lowercased, canonical)` commodity names.
    commodities: Vec<(String, String)>,
}

impl KeywordDetector {
    /// Creates a detector over `table`. Keywords are lowercased once here.
    #[must_use]
    pub fn new(table: KeywordTable) -> Self {
        let lower = |words: &[String]| words.iter().map(|w| w.to_lowercase()).collect();
        let table = KeywordTable {
            version: table.version,
            weather: lower(&table.weather),
            market: lower(&table.market),
            knowledge: lower(&table.knowledge),
            seasonal: lower(&table.seasonal),
            commodities: table.commodities,
        };
        let commodities = table
            .commodities
            .iter()
            .map(|name| (name.to_lowercase(), name.clone()))
            .collect();
        Self { table, commodities }
    }

    /// Returns the version of the keyword table in use.
    #[must_use]
    pub fn table_version(&self) -> &str {
        &self.table.version
    }

    fn matches(&self, kind: DataSourceKind, lowered: &str) -> bool {
        self.table
            .keywords(kind)
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }

    fn location(message: &str) -> Option<String> {
        LOCATION_RE
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|location| !location.is_empty())
    }

    fn commodity(&self, lowered: &str) -> Option<String> {
        self.commodities
            .iter()
            .find(|(needle, _)| lowered.contains(needle.as_str()))
            .map(|(_, canonical)| canonical.clone())
    }
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new(KeywordTable::builtin())
    }
}

impl DataNeedDetector for KeywordDetector {
    fn detect(&self, message: &str) -> DataNeeds {
        let lowered = message.to_lowercase();

        DataNeeds {
            weather: self.matches(DataSourceKind::Weather, &lowered),
            market: self.matches(DataSourceKind::Market, &lowered),
            knowledge: self.matches(DataSourceKind::Knowledge, &lowered),
            seasonal: self.matches(DataSourceKind::Seasonal, &lowered),
            location: Self::location(message),
            commodity: self.commodity(&lowered),
        }
    }
}
