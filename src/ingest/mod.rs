//! Catalog ingestion
//!
//! Writes already-decoded OpenLibrary and Archive.org documents into the
//! relational catalog. Fetching them over HTTP is left to the caller.

pub mod loader;
pub mod records;

use crate::relational::SourceError;
use std::path::Path;
use thiserror::Error;

pub use loader::{
    edition_for, ingest_archive, ingest_archive_stats, ingest_openlibrary, parse_access_date,
    IngestReport,
};
pub use records::{parse_docs, ArchiveDoc, ArchiveStatsRecord, OneOrMany, OpenLibraryDoc, YearValue};

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Catalog error: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Read documents from a JSON file in any envelope [`parse_docs`] accepts
pub fn read_docs<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> IngestResult<Vec<T>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_docs(&text)?)
}
