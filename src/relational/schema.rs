//! Relational catalog schema
//!
//! Uniqueness lives in the schema: re-ingesting a book, an archive document,
//! an author name, an edition or a join pair hits a constraint and is
//! ignored by the `ON CONFLICT DO NOTHING` / `INSERT OR IGNORE` writes.

pub const AUTHOR: &str = "author";
pub const BOOK: &str = "book";
pub const BOOK_AUTHOR: &str = "book_author";
pub const BOOK_EDITION: &str = "book_edition";
pub const ARCHIVE_DOCUMENT: &str = "archive_document";
pub const ARCHIVE_STATS: &str = "archive_stats";
pub const BOOK_ARCHIVE_LINK: &str = "book_archive_link";

pub const ALL_TABLES: [&str; 7] = [
    AUTHOR,
    BOOK,
    BOOK_AUTHOR,
    BOOK_EDITION,
    ARCHIVE_DOCUMENT,
    ARCHIVE_STATS,
    BOOK_ARCHIVE_LINK,
];

pub(crate) const CATALOG_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    author_id   INTEGER PRIMARY KEY,
    author_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS book (
    book_id            INTEGER PRIMARY KEY,
    title              TEXT,
    first_publish_year INTEGER,
    cover_edition_key  TEXT NOT NULL UNIQUE,
    has_fulltext       INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS book_author (
    book_id   INTEGER NOT NULL REFERENCES book(book_id),
    author_id INTEGER NOT NULL REFERENCES author(author_id),
    PRIMARY KEY (book_id, author_id)
);

CREATE TABLE IF NOT EXISTS book_edition (
    edition_id     INTEGER PRIMARY KEY,
    book_id        INTEGER NOT NULL REFERENCES book(book_id),
    edition_number INTEGER NOT NULL CHECK (edition_number > 0),
    edition_year   INTEGER NOT NULL,
    language       TEXT NOT NULL,
    UNIQUE (book_id, edition_number, edition_year, language)
);

CREATE TABLE IF NOT EXISTS archive_document (
    doc_id     INTEGER PRIMARY KEY,
    identifier TEXT NOT NULL UNIQUE,
    title      TEXT,
    creator    TEXT,
    year       INTEGER,
    language   TEXT,
    subject    TEXT,
    downloads  INTEGER
);

CREATE TABLE IF NOT EXISTS archive_stats (
    stat_id          INTEGER PRIMARY KEY,
    doc_id           INTEGER NOT NULL REFERENCES archive_document(doc_id),
    last_access_date TEXT,
    daily_downloads  INTEGER
);

CREATE TABLE IF NOT EXISTS book_archive_link (
    book_id INTEGER NOT NULL REFERENCES book(book_id),
    doc_id  INTEGER NOT NULL REFERENCES archive_document(doc_id),
    PRIMARY KEY (book_id, doc_id)
);
"#;
