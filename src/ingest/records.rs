//! Decoded catalog documents
//!
//! Field names follow the upstream JSON so documents deserialize straight
//! from a search response. Archive.org is loose about shapes: most text
//! fields may be a string or a list, and `year` may be a string or a number.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value the upstream API emits either alone or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.first(),
        }
    }
}

impl OneOrMany<String> {
    /// Join list values with `", "`
    pub fn joined(&self) -> String {
        match self {
            OneOrMany::One(value) => value.clone(),
            OneOrMany::Many(values) => values.join(", "),
        }
    }
}

/// Year as emitted by Archive.org: `1923`, `"1923"` or `"1923-05-01"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

impl YearValue {
    pub fn as_year(&self) -> Option<i64> {
        match self {
            YearValue::Number(year) => Some(*year),
            YearValue::Text(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.get(..4).and_then(|prefix| prefix.parse().ok()))
            }
        }
    }
}

/// One document of an OpenLibrary search response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLibraryDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_publish_year: Option<i64>,
    #[serde(default)]
    pub cover_edition_key: Option<String>,
    #[serde(default)]
    pub has_fulltext: bool,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub edition_count: Option<i64>,
    #[serde(default)]
    pub language: Option<OneOrMany<String>>,
}

impl OpenLibraryDoc {
    /// Edition key, if present and non-blank
    pub fn edition_key(&self) -> Option<&str> {
        self.cover_edition_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Primary language code, if any
    pub fn primary_language(&self) -> Option<&str> {
        self.language
            .as_ref()
            .and_then(OneOrMany::first)
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
    }
}

/// One document of an Archive.org advanced-search response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDoc {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub title: Option<OneOrMany<String>>,
    #[serde(default)]
    pub creator: Option<OneOrMany<String>>,
    #[serde(default)]
    pub year: Option<YearValue>,
    #[serde(default)]
    pub language: Option<OneOrMany<String>>,
    #[serde(default)]
    pub subject: Option<OneOrMany<String>>,
    #[serde(default)]
    pub downloads: Option<i64>,
}

/// Access statistics for an already-ingested archive document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStatsRecord {
    pub identifier: String,
    #[serde(default)]
    pub last_access_date: Option<String>,
    #[serde(default)]
    pub daily_downloads: Option<i64>,
}

#[derive(Deserialize)]
struct DocList<T> {
    docs: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    Docs(DocList<T>),
    Response { response: DocList<T> },
}

/// Decode documents from a raw API response or a bare JSON array
pub fn parse_docs<T: DeserializeOwned>(json: &str) -> serde_json::Result<Vec<T>> {
    Ok(match serde_json::from_str::<Envelope<T>>(json)? {
        Envelope::Bare(docs) => docs,
        Envelope::Docs(list) => list.docs,
        Envelope::Response { response } => response.docs,
    })
}
