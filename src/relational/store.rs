//! SQLite-backed catalog store

use super::model::{CatalogCounts, NewArchiveDocument, NewArchiveStats, NewBook, NewEdition};
use super::schema::{self, CATALOG_DDL};
use super::source::{is_identifier, RelationalSource, Row, RowQuery, SourceError, SourceResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use rustc_hash::FxHashSet;
use std::path::Path;
use tracing::{debug, info};

/// Relational catalog of books, authors, editions and archive documents.
///
/// Owns one connection; it is closed when the store is dropped, on every
/// exit path. All writes are idempotent: duplicates are ignored by the
/// schema's unique constraints instead of raising errors.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (or create) a catalog database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening catalog store at: {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// Open an existing catalog for reading only.
    ///
    /// No pragmas and no DDL: the file, its journal mode and its schema are
    /// left exactly as found. Writes through this store fail.
    pub fn open_read_only(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        info!("Opening catalog store read-only at: {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Fresh in-memory catalog
    pub fn open_in_memory() -> SourceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SourceResult<Self> {
        conn.execute_batch(CATALOG_DDL)?;
        Ok(Self { conn })
    }

    /// Raw connection, for ad-hoc queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction; rolled back if `f` fails
    pub fn in_transaction<T, E>(&self, f: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<SourceError>,
    {
        let tx = self.conn.unchecked_transaction().map_err(SourceError::from)?;
        let value = f(self)?;
        tx.commit().map_err(SourceError::from)?;
        Ok(value)
    }

    // ============================================================
    // Writes
    // ============================================================

    /// Returns false when the edition key is already present
    pub fn insert_book(&self, book: &NewBook) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO book (title, first_publish_year, cover_edition_key, has_fulltext)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (cover_edition_key) DO NOTHING",
            )?
            .execute(params![
                book.title,
                book.first_publish_year,
                book.cover_edition_key,
                book.has_fulltext
            ])?;
        Ok(inserted > 0)
    }

    /// Returns false when an author with this name exists
    pub fn insert_author(&self, name: &str) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO author (author_name) VALUES (?1)
                 ON CONFLICT (author_name) DO NOTHING",
            )?
            .execute(params![name])?;
        Ok(inserted > 0)
    }

    pub fn insert_book_author(&self, book_id: i64, author_id: i64) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO book_author (book_id, author_id) VALUES (?1, ?2)")?
            .execute(params![book_id, author_id])?;
        Ok(inserted > 0)
    }

    pub fn insert_edition(&self, edition: &NewEdition) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO book_edition (book_id, edition_number, edition_year, language)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT DO NOTHING",
            )?
            .execute(params![
                edition.book_id,
                edition.edition_number,
                edition.edition_year,
                edition.language
            ])?;
        Ok(inserted > 0)
    }

    /// Returns false when the identifier is already present
    pub fn insert_archive_document(&self, doc: &NewArchiveDocument) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO archive_document
                     (identifier, title, creator, year, language, subject, downloads)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (identifier) DO NOTHING",
            )?
            .execute(params![
                doc.identifier,
                doc.title,
                doc.creator,
                doc.year,
                doc.language,
                doc.subject,
                doc.downloads
            ])?;
        Ok(inserted > 0)
    }

    /// Stats rows have no natural key; every call appends one. Returns the new id.
    pub fn insert_archive_stats(&self, stats: &NewArchiveStats) -> SourceResult<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO archive_stats (doc_id, last_access_date, daily_downloads)
                 VALUES (?1, ?2, ?3)",
            )?
            .execute(params![
                stats.doc_id,
                stats
                    .last_access_date
                    .map(|date| date.format("%Y-%m-%d").to_string()),
                stats.daily_downloads
            ])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_book_archive_link(&self, book_id: i64, doc_id: i64) -> SourceResult<bool> {
        let inserted = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO book_archive_link (book_id, doc_id) VALUES (?1, ?2)")?
            .execute(params![book_id, doc_id])?;
        Ok(inserted > 0)
    }

    // ============================================================
    // Lookups
    // ============================================================

    pub fn book_id_by_edition_key(&self, cover_edition_key: &str) -> SourceResult<Option<i64>> {
        Ok(self
            .conn
            .prepare_cached("SELECT book_id FROM book WHERE cover_edition_key = ?1")?
            .query_row(params![cover_edition_key], |row| row.get(0))
            .optional()?)
    }

    pub fn author_id_by_name(&self, name: &str) -> SourceResult<Option<i64>> {
        Ok(self
            .conn
            .prepare_cached("SELECT author_id FROM author WHERE author_name = ?1")?
            .query_row(params![name], |row| row.get(0))
            .optional()?)
    }

    pub fn doc_id_by_identifier(&self, identifier: &str) -> SourceResult<Option<i64>> {
        Ok(self
            .conn
            .prepare_cached("SELECT doc_id FROM archive_document WHERE identifier = ?1")?
            .query_row(params![identifier], |row| row.get(0))
            .optional()?)
    }

    /// `(book_id, title)` for every book, in id order
    pub fn book_titles(&self) -> SourceResult<Vec<(i64, Option<String>)>> {
        self.id_title_pairs("SELECT book_id, title FROM book ORDER BY book_id")
    }

    /// `(doc_id, title)` for every archive document, in id order
    pub fn archive_titles(&self) -> SourceResult<Vec<(i64, Option<String>)>> {
        self.id_title_pairs("SELECT doc_id, title FROM archive_document ORDER BY doc_id")
    }

    fn id_title_pairs(&self, sql: &str) -> SourceResult<Vec<(i64, Option<String>)>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every `(book_id, doc_id)` pair already in the join table
    pub fn book_archive_links(&self) -> SourceResult<FxHashSet<(i64, i64)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT book_id, doc_id FROM book_archive_link")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<FxHashSet<_>, _>>()?)
    }

    pub fn count(&self, table: &str) -> SourceResult<usize> {
        if !schema::ALL_TABLES.contains(&table) {
            return Err(SourceError::InvalidQuery(format!("unknown table '{}'", table)));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn counts(&self) -> SourceResult<CatalogCounts> {
        Ok(CatalogCounts {
            authors: self.count(schema::AUTHOR)?,
            books: self.count(schema::BOOK)?,
            book_authors: self.count(schema::BOOK_AUTHOR)?,
            editions: self.count(schema::BOOK_EDITION)?,
            archive_documents: self.count(schema::ARCHIVE_DOCUMENT)?,
            archive_stats: self.count(schema::ARCHIVE_STATS)?,
            book_archive_links: self.count(schema::BOOK_ARCHIVE_LINK)?,
        })
    }
}

impl RelationalSource for CatalogStore {
    fn fetch_rows(&self, query: &RowQuery, after: Option<i64>, limit: usize) -> SourceResult<Vec<Row>> {
        if !is_identifier(query.table) {
            return Err(SourceError::InvalidQuery(format!("bad table name '{}'", query.table)));
        }
        if let Some(column) = query.columns.iter().find(|c| !is_identifier(c)) {
            return Err(SourceError::InvalidQuery(format!("bad column name '{}'", column)));
        }

        let filter = if after.is_some() { "WHERE rowid > ?2" } else { "" };
        let sql = format!(
            "SELECT rowid, {} FROM {} {} ORDER BY rowid LIMIT ?1",
            query.columns.join(", "),
            query.table,
            filter
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let width = query.columns.len();
        let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
            let cursor: i64 = row.get(0)?;
            let cells = (1..=width)
                .map(|idx| row.get(idx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Row::new(cursor, cells))
        };

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = match after {
            Some(after) => stmt.query_map(params![limit, after], read)?,
            None => stmt.query_map(params![limit], read)?,
        };
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        debug!(table = query.table, ?after, fetched = rows.len(), "fetched rows");
        Ok(rows)
    }
}
