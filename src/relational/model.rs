//! Row shapes written into the catalog

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: Option<String>,
    pub first_publish_year: Option<i64>,
    /// Unique external edition key; books without one are never stored
    pub cover_edition_key: String,
    pub has_fulltext: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEdition {
    pub book_id: i64,
    pub edition_number: i64,
    pub edition_year: i64,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArchiveDocument {
    /// Unique external identifier
    pub identifier: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub year: Option<i64>,
    /// Scalar code, or a JSON array of codes when the catalog listed several
    pub language: Option<String>,
    pub subject: Option<String>,
    pub downloads: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArchiveStats {
    pub doc_id: i64,
    pub last_access_date: Option<NaiveDate>,
    pub daily_downloads: Option<i64>,
}

/// Row counts per catalog table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub authors: usize,
    pub books: usize,
    pub book_authors: usize,
    pub editions: usize,
    pub archive_documents: usize,
    pub archive_stats: usize,
    pub book_archive_links: usize,
}
