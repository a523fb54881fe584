//! Bibliograph
//!
//! Moves a bibliographic catalog (books, authors, editions) and a full-text
//! archive catalog (documents and their access statistics) out of a
//! normalized relational store and into a labeled property graph.
//!
//! # Architecture
//!
//! - `relational`: SQLite catalog, the migration's source of truth
//! - `ingest`: writes decoded OpenLibrary / Archive.org documents into the catalog
//! - `linker`: links books to archive documents by title containment
//! - `migration`: batch reader, row mapper, projection builder and orchestrator
//! - `graph`: in-memory property graph with merge-by-key and snapshots
//!
//! Every write on either side is idempotent, so an interrupted run can
//! simply be repeated.
//!
//! ## Example Usage
//!
//! ```rust
//! use bibliograph::ingest::{ingest_archive, ingest_openlibrary, ArchiveDoc, OneOrMany, OpenLibraryDoc};
//! use bibliograph::linker::{link_catalog, LinkStrategy};
//! use bibliograph::migration::{migrate_into, MigrationConfig, RunStatus};
//! use bibliograph::{CatalogStore, GraphStore};
//!
//! let catalog = CatalogStore::open_in_memory().unwrap();
//! ingest_openlibrary(&catalog, &[OpenLibraryDoc {
//!     title: Some("Physics 101".into()),
//!     cover_edition_key: Some("OL123".into()),
//!     author_name: vec!["Jane Doe".into()],
//!     ..Default::default()
//! }]).unwrap();
//! ingest_archive(&catalog, &[ArchiveDoc {
//!     identifier: Some("physics101textbook".into()),
//!     title: Some(OneOrMany::One("Physics 101 Textbook".into())),
//!     ..Default::default()
//! }]).unwrap();
//! link_catalog(&catalog, LinkStrategy::Indexed).unwrap();
//!
//! let mut graph = GraphStore::new();
//! let report = migrate_into(&catalog, &mut graph, &MigrationConfig::default());
//!
//! assert_eq!(report.status, RunStatus::Complete);
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 2);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod ingest;
pub mod linker;
pub mod migration;
pub mod relational;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStatistics, GraphStore, GraphTarget,
    Label, Node, NodeId, NodeKey, PropertyMap, PropertyValue,
};

pub use relational::{CatalogStore, RelationalSource, SourceError, SourceResult};

pub use linker::{EntityLinker, LinkError, LinkReport, LinkStrategy};

pub use migration::{
    migrate, MigrationConfig, MigrationError, MigrationReport, MigrationResult, Migrator, Stage,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
