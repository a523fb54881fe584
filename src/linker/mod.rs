//! Book ↔ archive document linking
//!
//! The catalogs share no key, so a document is linked to a book when the
//! book's lower-cased title occurs anywhere in the document's lower-cased
//! title. The test is one-directional and deliberately loose: a short or
//! generic book title matches many documents.

use crate::relational::{CatalogStore, SourceError};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Linker errors
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Catalog error: {0}")]
    Source(#[from] SourceError),

    #[error("Unknown link strategy '{0}' (expected 'indexed' or 'naive')")]
    UnknownStrategy(String),
}

pub type LinkResult<T> = Result<T, LinkError>;

/// How document titles are scanned. Both produce the same links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// Load lower-cased document titles once and reuse them for every book
    #[default]
    Indexed,
    /// Re-read document titles from the catalog for every book
    Naive,
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStrategy::Indexed => write!(f, "indexed"),
            LinkStrategy::Naive => write!(f, "naive"),
        }
    }
}

impl FromStr for LinkStrategy {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "indexed" => Ok(LinkStrategy::Indexed),
            "naive" => Ok(LinkStrategy::Naive),
            other => Err(LinkError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Counts from one linker pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub strategy: LinkStrategy,
    pub books_scanned: usize,
    /// Books with an empty or missing title; never linked
    pub books_without_title: usize,
    pub documents_indexed: usize,
    pub matches: usize,
    pub links_inserted: usize,
    pub links_existing: usize,
}

/// Lower-cased, non-empty title
fn fold_title(title: Option<&str>) -> Option<String> {
    title.map(str::to_lowercase).filter(|t| !t.is_empty())
}

/// Whether `book_title` links to `doc_title`
pub fn title_matches(book_title: &str, doc_title: &str) -> bool {
    let needle = book_title.to_lowercase();
    !needle.is_empty() && doc_title.to_lowercase().contains(&needle)
}

/// Lower-cased document titles, built once per pass
#[derive(Debug, Default)]
pub struct TitleIndex {
    entries: Vec<(String, i64)>,
}

impl TitleIndex {
    pub fn build(documents: &[(i64, Option<String>)]) -> Self {
        let entries = documents
            .iter()
            .filter_map(|(doc_id, title)| Some((fold_title(title.as_deref())?, *doc_id)))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every document whose title contains `folded_book_title`
    pub fn containing<'a>(&'a self, folded_book_title: &'a str) -> impl Iterator<Item = i64> + 'a {
        self.entries
            .iter()
            .filter(move |(title, _)| title.contains(folded_book_title))
            .map(|(_, doc_id)| *doc_id)
    }
}

/// Pure matching over in-memory titles: every `(book_id, doc_id)` pair to link
pub fn find_matches(
    books: &[(i64, Option<String>)],
    documents: &[(i64, Option<String>)],
) -> Vec<(i64, i64)> {
    let index = TitleIndex::build(documents);
    books
        .iter()
        .filter_map(|(book_id, title)| Some((*book_id, fold_title(title.as_deref())?)))
        .flat_map(|(book_id, title)| {
            index
                .containing(&title)
                .map(move |doc_id| (book_id, doc_id))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Runs linker passes against a catalog
pub struct EntityLinker<'a> {
    store: &'a CatalogStore,
    strategy: LinkStrategy,
}

impl<'a> EntityLinker<'a> {
    pub fn new(store: &'a CatalogStore, strategy: LinkStrategy) -> Self {
        Self { store, strategy }
    }

    pub fn strategy(&self) -> LinkStrategy {
        self.strategy
    }

    /// Link every book to every document containing its title.
    ///
    /// Existing pairs are loaded once up front and skipped; the insert itself
    /// also ignores a pair that already exists. Re-running is a no-op.
    pub fn run(&self) -> LinkResult<LinkReport> {
        let mut report = LinkReport {
            strategy: self.strategy,
            ..Default::default()
        };

        let books = self.store.book_titles()?;
        let mut existing = self.store.book_archive_links()?;
        let index = match self.strategy {
            LinkStrategy::Indexed => {
                let index = TitleIndex::build(&self.store.archive_titles()?);
                report.documents_indexed = index.len();
                Some(index)
            }
            LinkStrategy::Naive => {
                report.documents_indexed = self
                    .store
                    .archive_titles()?
                    .iter()
                    .filter(|(_, title)| fold_title(title.as_deref()).is_some())
                    .count();
                None
            }
        };

        self.store.in_transaction(|store| {
            for (book_id, title) in &books {
                report.books_scanned += 1;
                let Some(folded) = fold_title(title.as_deref()) else {
                    report.books_without_title += 1;
                    continue;
                };

                let doc_ids: Vec<i64> = match &index {
                    Some(index) => index.containing(&folded).collect(),
                    None => store
                        .archive_titles()?
                        .iter()
                        .filter(|(_, doc_title)| {
                            doc_title
                                .as_deref()
                                .is_some_and(|t| t.to_lowercase().contains(&folded))
                        })
                        .map(|(doc_id, _)| *doc_id)
                        .collect(),
                };

                for doc_id in doc_ids {
                    report.matches += 1;
                    if existing.contains(&(*book_id, doc_id)) {
                        report.links_existing += 1;
                        continue;
                    }
                    if store.insert_book_archive_link(*book_id, doc_id)? {
                        report.links_inserted += 1;
                    } else {
                        report.links_existing += 1;
                    }
                    existing.insert((*book_id, doc_id));
                }
                debug!(book_id, title = %folded, "linked book");
            }
            Ok::<_, LinkError>(())
        })?;

        info!(
            strategy = %self.strategy,
            books = report.books_scanned,
            matches = report.matches,
            inserted = report.links_inserted,
            "entity linking complete"
        );
        Ok(report)
    }
}

/// Shorthand for a single pass with `strategy`
pub fn link_catalog(store: &CatalogStore, strategy: LinkStrategy) -> LinkResult<LinkReport> {
    EntityLinker::new(store, strategy).run()
}

/// Pairs currently linked in the catalog
pub fn current_links(store: &CatalogStore) -> LinkResult<FxHashSet<(i64, i64)>> {
    Ok(store.book_archive_links()?)
}
