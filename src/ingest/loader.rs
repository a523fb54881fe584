//! Persists decoded catalog documents into the relational catalog

use super::records::{ArchiveDoc, ArchiveStatsRecord, OpenLibraryDoc, OneOrMany};
use super::{IngestError, IngestResult};
use crate::relational::{CatalogStore, NewArchiveDocument, NewArchiveStats, NewBook, NewEdition};
use chrono::{DateTime, NaiveDate};
use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What one ingestion call did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub books_seen: usize,
    pub books_inserted: usize,
    pub books_without_key: usize,
    pub authors_inserted: usize,
    pub authorships_inserted: usize,
    pub editions_inserted: usize,
    pub editions_skipped: usize,
    pub documents_seen: usize,
    pub documents_inserted: usize,
    pub documents_without_identifier: usize,
    pub stats_inserted: usize,
    pub stats_skipped: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: &IngestReport) {
        self.books_seen += other.books_seen;
        self.books_inserted += other.books_inserted;
        self.books_without_key += other.books_without_key;
        self.authors_inserted += other.authors_inserted;
        self.authorships_inserted += other.authorships_inserted;
        self.editions_inserted += other.editions_inserted;
        self.editions_skipped += other.editions_skipped;
        self.documents_seen += other.documents_seen;
        self.documents_inserted += other.documents_inserted;
        self.documents_without_identifier += other.documents_without_identifier;
        self.stats_inserted += other.stats_inserted;
        self.stats_skipped += other.stats_skipped;
    }
}

/// Edition row for a book, only when count, year and language are all usable
pub fn edition_for(book_id: i64, doc: &OpenLibraryDoc) -> Option<NewEdition> {
    let edition_number = doc.edition_count.filter(|count| *count > 0)?;
    let edition_year = doc.first_publish_year?;
    let language = doc.primary_language()?;
    Some(NewEdition {
        book_id,
        edition_number,
        edition_year,
        language: language.to_string(),
    })
}

/// Ingest one batch of OpenLibrary search documents.
///
/// Books without an edition key are skipped. Author names are deduplicated
/// across the batch in first-seen order before insertion; the catalog's
/// unique constraint covers names from earlier runs. The whole batch is
/// written in a single transaction.
pub fn ingest_openlibrary(store: &CatalogStore, docs: &[OpenLibraryDoc]) -> IngestResult<IngestReport> {
    let mut report = IngestReport {
        books_seen: docs.len(),
        ..Default::default()
    };

    store.in_transaction(|store| {
        let mut keyed = Vec::with_capacity(docs.len());
        for doc in docs {
            let Some(key) = doc.edition_key() else {
                report.books_without_key += 1;
                continue;
            };
            let book = NewBook {
                title: doc.title.clone(),
                first_publish_year: doc.first_publish_year,
                cover_edition_key: key.to_string(),
                has_fulltext: doc.has_fulltext,
            };
            if store.insert_book(&book)? {
                report.books_inserted += 1;
            }
            keyed.push((key, doc));
        }

        let names: IndexSet<&str> = keyed
            .iter()
            .flat_map(|(_, doc)| doc.author_name.iter())
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        for name in &names {
            if store.insert_author(name)? {
                report.authors_inserted += 1;
            }
        }

        for (key, doc) in &keyed {
            let Some(book_id) = store.book_id_by_edition_key(key)? else {
                continue;
            };

            for name in doc.author_name.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                if let Some(author_id) = store.author_id_by_name(name)? {
                    if store.insert_book_author(book_id, author_id)? {
                        report.authorships_inserted += 1;
                    }
                }
            }

            match edition_for(book_id, doc) {
                Some(edition) => {
                    if store.insert_edition(&edition)? {
                        report.editions_inserted += 1;
                    }
                }
                None => report.editions_skipped += 1,
            }
        }
        Ok::<_, IngestError>(())
    })?;

    info!(
        books = report.books_inserted,
        authors = report.authors_inserted,
        editions = report.editions_inserted,
        skipped = report.books_without_key,
        "ingested OpenLibrary batch"
    );
    Ok(report)
}

fn archive_row(identifier: &str, doc: &ArchiveDoc) -> IngestResult<NewArchiveDocument> {
    let language = match &doc.language {
        None => None,
        Some(OneOrMany::One(code)) => Some(code.clone()),
        Some(OneOrMany::Many(codes)) if codes.is_empty() => None,
        Some(OneOrMany::Many(codes)) => Some(serde_json::to_string(codes)?),
    };

    Ok(NewArchiveDocument {
        identifier: identifier.to_string(),
        title: doc.title.as_ref().map(OneOrMany::joined),
        creator: doc.creator.as_ref().map(OneOrMany::joined),
        year: doc.year.as_ref().and_then(|year| year.as_year()),
        language,
        subject: doc.subject.as_ref().map(OneOrMany::joined),
        downloads: doc.downloads,
    })
}

/// Ingest one batch of Archive.org documents, skipping those without an identifier
pub fn ingest_archive(store: &CatalogStore, docs: &[ArchiveDoc]) -> IngestResult<IngestReport> {
    let mut report = IngestReport {
        documents_seen: docs.len(),
        ..Default::default()
    };

    store.in_transaction(|store| {
        for doc in docs {
            let identifier = doc
                .identifier
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty());
            let Some(identifier) = identifier else {
                report.documents_without_identifier += 1;
                continue;
            };

            let row = archive_row(identifier, doc)?;
            if store.insert_archive_document(&row)? {
                report.documents_inserted += 1;
            }
        }
        Ok::<_, IngestError>(())
    })?;

    info!(
        documents = report.documents_inserted,
        skipped = report.documents_without_identifier,
        "ingested Archive batch"
    );
    Ok(report)
}

/// Parse `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp
pub fn parse_access_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

/// Append access statistics for known archive documents.
///
/// Records naming an unknown identifier, or carrying an unreadable date, are
/// skipped and counted.
pub fn ingest_archive_stats(
    store: &CatalogStore,
    records: &[ArchiveStatsRecord],
) -> IngestResult<IngestReport> {
    let mut report = IngestReport::default();

    store.in_transaction(|store| {
        for record in records {
            let Some(doc_id) = store.doc_id_by_identifier(record.identifier.trim())? else {
                warn!(identifier = %record.identifier, "stats for unknown archive document");
                report.stats_skipped += 1;
                continue;
            };

            let last_access_date = match record.last_access_date.as_deref() {
                None => None,
                Some(text) => match parse_access_date(text) {
                    Some(date) => Some(date),
                    None => {
                        warn!(identifier = %record.identifier, date = text, "unreadable access date");
                        report.stats_skipped += 1;
                        continue;
                    }
                },
            };

            store.insert_archive_stats(&NewArchiveStats {
                doc_id,
                last_access_date,
                daily_downloads: record.daily_downloads,
            })?;
            report.stats_inserted += 1;
        }
        Ok::<_, IngestError>(())
    })?;

    debug!(inserted = report.stats_inserted, skipped = report.stats_skipped, "ingested archive stats");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::schema;

    fn book(key: Option<&str>, authors: &[&str]) -> OpenLibraryDoc {
        OpenLibraryDoc {
            title: Some("Physics 101".to_string()),
            first_publish_year: Some(1999),
            cover_edition_key: key.map(str::to_string),
            has_fulltext: true,
            author_name: authors.iter().map(|a| a.to_string()).collect(),
            edition_count: Some(3),
            language: Some(OneOrMany::One("eng".to_string())),
        }
    }

    #[test]
    fn test_edition_filtering() {
        let complete = book(Some("OL1"), &[]);
        let edition = edition_for(7, &complete).unwrap();
        assert_eq!(edition.edition_number, 3);
        assert_eq!(edition.edition_year, 1999);
        assert_eq!(edition.language, "eng");

        let zero_count = OpenLibraryDoc { edition_count: Some(0), ..complete.clone() };
        let no_year = OpenLibraryDoc { first_publish_year: None, ..complete.clone() };
        let no_language = OpenLibraryDoc { language: None, ..complete.clone() };
        assert!(edition_for(7, &zero_count).is_none());
        assert!(edition_for(7, &no_year).is_none());
        assert!(edition_for(7, &no_language).is_none());
    }

    #[test]
    fn test_language_list_takes_first() {
        let doc = OpenLibraryDoc {
            language: Some(OneOrMany::Many(vec!["ger".into(), "eng".into()])),
            ..book(Some("OL1"), &[])
        };
        assert_eq!(edition_for(1, &doc).unwrap().language, "ger");
    }

    #[test]
    fn test_openlibrary_ingest_dedups_authors_and_skips_keyless() {
        let store = CatalogStore::open_in_memory().unwrap();
        let docs = vec![
            book(Some("OL1"), &["Jane Doe", "John Roe"]),
            book(Some("OL2"), &["Jane Doe"]),
            book(None, &["Nobody"]),
        ];

        let report = ingest_openlibrary(&store, &docs).unwrap();
        assert_eq!(report.books_inserted, 2);
        assert_eq!(report.books_without_key, 1);
        assert_eq!(report.authors_inserted, 2);
        assert_eq!(report.authorships_inserted, 3);
        assert_eq!(report.editions_inserted, 2);

        // Nobody's only book had no key
        assert!(store.author_id_by_name("Nobody").unwrap().is_none());
    }

    #[test]
    fn test_openlibrary_reingest_is_noop() {
        let store = CatalogStore::open_in_memory().unwrap();
        let docs = vec![book(Some("OL1"), &["Jane Doe"])];
        ingest_openlibrary(&store, &docs).unwrap();
        let before = store.counts().unwrap();

        let report = ingest_openlibrary(&store, &docs).unwrap();
        assert_eq!(report.books_inserted, 0);
        assert_eq!(report.authors_inserted, 0);
        assert_eq!(store.counts().unwrap(), before);
    }

    #[test]
    fn test_archive_ingest() {
        let store = CatalogStore::open_in_memory().unwrap();
        let docs = vec![
            ArchiveDoc {
                identifier: Some("phys101".into()),
                title: Some(OneOrMany::One("Physics 101 Textbook".into())),
                subject: Some(OneOrMany::Many(vec!["physics".into(), "science".into()])),
                language: Some(OneOrMany::Many(vec!["eng".into(), "fre".into()])),
                ..Default::default()
            },
            ArchiveDoc::default(),
        ];

        let report = ingest_archive(&store, &docs).unwrap();
        assert_eq!(report.documents_inserted, 1);
        assert_eq!(report.documents_without_identifier, 1);

        let (subject, language): (String, String) = store
            .connection()
            .query_row(
                "SELECT subject, language FROM archive_document WHERE identifier = 'phys101'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(subject, "physics, science");
        assert_eq!(language, r#"["eng","fre"]"#);
    }

    #[test]
    fn test_archive_stats_ingest() {
        let store = CatalogStore::open_in_memory().unwrap();
        ingest_archive(
            &store,
            &[ArchiveDoc {
                identifier: Some("phys101".into()),
                ..Default::default()
            }],
        )
        .unwrap();

        let records = vec![
            ArchiveStatsRecord {
                identifier: "phys101".into(),
                last_access_date: Some("2024-03-01T10:00:00Z".into()),
                daily_downloads: Some(12),
            },
            ArchiveStatsRecord {
                identifier: "missing".into(),
                last_access_date: None,
                daily_downloads: None,
            },
            ArchiveStatsRecord {
                identifier: "phys101".into(),
                last_access_date: Some("yesterday".into()),
                daily_downloads: None,
            },
        ];
        let report = ingest_archive_stats(&store, &records).unwrap();
        assert_eq!(report.stats_inserted, 1);
        assert_eq!(report.stats_skipped, 2);

        let date: String = store
            .connection()
            .query_row("SELECT last_access_date FROM archive_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(date, "2024-03-01");
        assert_eq!(store.count(schema::ARCHIVE_STATS).unwrap(), 1);
    }
}
