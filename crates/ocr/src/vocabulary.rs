//! Keyword tables driving the receipt parser.
//!
//! Both tables are plain data so new chains or footer phrases can be added
//! from a TOML file without touching the parsing code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Why a receipt line is excluded from the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Subtotal / total summary rows.
    Summary,
    Tax,
    /// Savings and discount rows.
    Savings,
    Rounding,
    /// Tender and change rows.
    Payment,
    /// Survey prompts, "items sold" counters and similar footers.
    Footer,
    Header,
}

pub const DEFAULT_SKIP_KEYWORDS: &[(&str, SkipReason)] = &[
    ("subtotal", SkipReason::Summary),
    ("total", SkipReason::Summary),
    ("tax", SkipReason::Tax),
    ("saving", SkipReason::Savings),
    ("savings", SkipReason::Savings),
    ("rounded", SkipReason::Rounding),
    ("cash", SkipReason::Payment),
    ("change", SkipReason::Payment),
    ("discount", SkipReason::Savings),
    ("customer", SkipReason::Footer),
    ("feedback", SkipReason::Footer),
    ("sold", SkipReason::Footer),
    ("hst", SkipReason::Tax),
    ("receipt", SkipReason::Header),
];

/// Lower-case substring → chain it identifies.
pub const DEFAULT_STORE_KEYWORDS: &[(&str, &str)] = &[
    ("basics", "Food Basics"),
    ("foodbasics", "Food Basics"),
    ("walmart", "Walmart"),
    ("freshco", "FreshCo"),
    ("metro", "Metro"),
    ("nofrills", "No Frills"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipKeyword {
    pub keyword: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreKeyword {
    pub keyword: String,
    pub chain: String,
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Empty keyword in {0} table")]
    EmptyKeyword(&'static str),
}

/// On-disk shape of a vocabulary file.
#[derive(Debug, Default, Deserialize)]
struct VocabularyFile {
    /// Drop the built-in tables instead of extending them.
    #[serde(default)]
    replace_defaults: bool,
    #[serde(default)]
    skip_keywords: Vec<SkipKeyword>,
    #[serde(default)]
    stores: Vec<StoreKeyword>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserVocabulary {
    skip_keywords: Vec<SkipKeyword>,
    stores: Vec<StoreKeyword>,
}

impl Default for ParserVocabulary {
    fn default() -> Self {
        Self {
            skip_keywords: DEFAULT_SKIP_KEYWORDS
                .iter()
                .map(|(keyword, reason)| SkipKeyword { keyword: keyword.to_string(), reason: *reason })
                .collect(),
            stores: DEFAULT_STORE_KEYWORDS
                .iter()
                .map(|(keyword, chain)| StoreKeyword { keyword: keyword.to_string(), chain: chain.to_string() })
                .collect(),
        }
    }
}

impl ParserVocabulary {
    /// Build a vocabulary from explicit tables. Keywords are lower-cased.
    pub fn new(
        skip_keywords: Vec<SkipKeyword>,
        stores: Vec<StoreKeyword>,
    ) -> Result<Self, VocabularyError> {
        if skip_keywords.iter().any(|k| k.keyword.trim().is_empty()) {
            return Err(VocabularyError::EmptyKeyword("skip_keywords"));
        }
        if stores.iter().any(|s| s.keyword.trim().is_empty()) {
            return Err(VocabularyError::EmptyKeyword("stores"));
        }
        Ok(Self {
            skip_keywords: skip_keywords
                .into_iter()
                .map(|k| SkipKeyword { keyword: k.keyword.trim().to_lowercase(), ..k })
                .collect(),
            stores: stores
                .into_iter()
                .map(|s| StoreKeyword { keyword: s.keyword.trim().to_lowercase(), ..s })
                .collect(),
        })
    }

    /// Parse a TOML vocabulary. Entries extend the built-in tables unless the
    /// file sets `replace_defaults = true`.
    ///
    /// ```toml
    /// [[stores]]
    /// keyword = "loblaws"
    /// chain = "Loblaws"
    ///
    /// [[skip_keywords]]
    /// keyword = "deposit"
    /// reason = "footer"
    /// ```
    pub fn from_toml(toml_content: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = toml::from_str(toml_content)?;
        let (mut skip_keywords, mut stores) = if file.replace_defaults {
            (vec![], vec![])
        } else {
            let defaults = Self::default();
            (defaults.skip_keywords, defaults.stores)
        };
        skip_keywords.extend(file.skip_keywords);
        stores.extend(file.stores);
        Self::new(skip_keywords, stores)
    }

    pub fn from_file(path: &Path) -> Result<Self, VocabularyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// First skip keyword contained in an already lower-cased line.
    pub fn skip_reason(&self, lower_line: &str) -> Option<SkipReason> {
        self.skip_keywords
            .iter()
            .find(|k| lower_line.contains(k.keyword.as_str()))
            .map(|k| k.reason)
    }

    /// Chain named by an already lower-cased line, if any.
    pub fn store_chain(&self, lower_line: &str) -> Option<&str> {
        self.stores
            .iter()
            .find(|s| lower_line.contains(s.keyword.as_str()))
            .map(|s| s.chain.as_str())
    }

    pub fn skip_keywords(&self) -> &[SkipKeyword] {
        &self.skip_keywords
    }

    pub fn stores(&self) -> &[StoreKeyword] {
        &self.stores
    }
}
