//! Read interface the migration pipeline consumes.

use thiserror::Error;

/// A single relational cell
pub type Cell = rusqlite::types::Value;

/// Relational errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Fixed projection over one table: which columns to read, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowQuery {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

/// One fetched row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Position of the row in its table; strictly increasing across fetches
    pub cursor: i64,
    /// Cells in the order of [`RowQuery::columns`]
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cursor: i64, cells: Vec<Cell>) -> Self {
        Self { cursor, cells }
    }
}

/// Relational store the pipeline reads from.
///
/// Reads are keyset-paginated: `fetch_rows` returns up to `limit` rows whose
/// cursor is strictly greater than `after`, ordered by cursor. `after: None`
/// starts from the first row whatever its cursor, including zero and
/// negative rowids. An empty result means the table is exhausted.
pub trait RelationalSource {
    fn fetch_rows(&self, query: &RowQuery, after: Option<i64>, limit: usize) -> SourceResult<Vec<Row>>;
}

impl<S: RelationalSource + ?Sized> RelationalSource for &S {
    fn fetch_rows(&self, query: &RowQuery, after: Option<i64>, limit: usize) -> SourceResult<Vec<Row>> {
        (**self).fetch_rows(query, after, limit)
    }
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
