//! Relational catalog
//!
//! The normalized source side of the migration:
//! - Schema for books, authors, editions, archive documents and their joins
//! - SQLite store with conflict-ignoring writes
//! - Keyset-paginated row reads through [`RelationalSource`]

pub mod model;
pub mod schema;
pub mod source;
pub mod store;

pub use model::{CatalogCounts, NewArchiveDocument, NewArchiveStats, NewBook, NewEdition};
pub use source::{Cell, RelationalSource, Row, RowQuery, SourceError, SourceResult};
pub use store::CatalogStore;
