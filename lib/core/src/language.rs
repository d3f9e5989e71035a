//! Supported conversation languages and language-keyed lookup tables.
//!
//! Every translated string table in the workspace is a [`LanguageTable`]:
//! English is mandatory, the regional languages are optional, and lookups
//! for a missing translation fall back to English.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language the assistant can converse in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Hindi.
    Hi,
    /// Kannada.
    Kn,
    /// Malayalam.
    Ml,
}

impl Language {
    /// All supported languages, in declaration order.
    pub const ALL: [Language; 4] = [Self::En, Self::Hi, Self::Kn, Self::Ml];

    /// Returns the wire code (`en`, `hi`, `kn`, `ml`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Kn => "kn",
            Self::Ml => "ml",
        }
    }

    /// Returns the English name of the language, for use inside prompts.
    #[must_use]
    pub const fn english_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Kn => "Kannada",
            Self::Ml => "Malayalam",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a language code is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLanguageError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported language: {}", self.input)
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for Language {
    type Err = ParseLanguageError;

    /// Parses an exact wire code. Codes are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| ParseLanguageError {
                input: s.to_string(),
            })
    }
}

/// A value per language, with English as the mandatory fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable<T> {
    en: T,
    hi: Option<T>,
    kn: Option<T>,
    ml: Option<T>,
}

impl<T> LanguageTable<T> {
    /// Creates a table holding only the English value.
    #[must_use]
    pub const fn english(en: T) -> Self {
        Self {
            en,
            hi: None,
            kn: None,
            ml: None,
        }
    }

    /// Creates a table with every language populated.
    #[must_use]
    pub const fn complete(en: T, hi: T, kn: T, ml: T) -> Self {
        Self {
            en,
            hi: Some(hi),
            kn: Some(kn),
            ml: Some(ml),
        }
    }

    /// Creates a table where only some languages have their own value.
    #[must_use]
    pub const fn partial(en: T, hi: Option<T>, kn: Option<T>, ml: Option<T>) -> Self {
        Self { en, hi, kn, ml }
    }

    /// Sets the value for one language.
    #[must_use]
    pub fn with(mut self, language: Language, value: T) -> Self {
        match language {
            Language::En => self.en = value,
            Language::Hi => self.hi = Some(value),
            Language::Kn => self.kn = Some(value),
            Language::Ml => self.ml = Some(value),
        }
        self
    }

    /// Returns the value for `language`, or the English value if that
    /// language has no entry.
    #[must_use]
    pub fn resolve(&self, language: Language) -> &T {
        self.get(language).unwrap_or(&self.en)
    }

    /// Returns the value for `language` without falling back.
    #[must_use]
    pub fn get(&self, language: Language) -> Option<&T> {
        match language {
            Language::En => Some(&self.en),
            Language::Hi => self.hi.as_ref(),
            Language::Kn => self.kn.as_ref(),
            Language::Ml => self.ml.as_ref(),
        }
    }

    /// Returns the languages that have no entry of their own.
    #[must_use]
    pub fn missing(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|lang| self.get(*lang).is_none())
            .collect()
    }
}
