//! Declarative relational-to-graph mapping
//!
//! One [`Projection`] per stage says which table and columns to read and
//! what node or edge each row becomes. The reader, mapper and projection
//! builder all consume this table; nothing else encodes the mapping.

use crate::relational::schema as tables;
use crate::relational::RowQuery;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One stage of a migration run, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authors,
    Books,
    Editions,
    ArchiveDocuments,
    ArchiveStats,
    Wrote,
    HasEdition,
    HasStats,
    LinkedTo,
}

impl Stage {
    /// Every stage; node stages strictly before edge stages
    pub const ALL: [Stage; 9] = [
        Stage::Authors,
        Stage::Books,
        Stage::Editions,
        Stage::ArchiveDocuments,
        Stage::ArchiveStats,
        Stage::Wrote,
        Stage::HasEdition,
        Stage::HasStats,
        Stage::LinkedTo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Authors => "authors",
            Stage::Books => "books",
            Stage::Editions => "editions",
            Stage::ArchiveDocuments => "archive_documents",
            Stage::ArchiveStats => "archive_stats",
            Stage::Wrote => "wrote",
            Stage::HasEdition => "has_edition",
            Stage::HasStats => "has_stats",
            Stage::LinkedTo => "linked_to",
        }
    }

    pub fn is_edge(self) -> bool {
        matches!(self.projection().shape, Shape::Edge(_))
    }

    pub fn projection(self) -> &'static Projection {
        // PROJECTIONS is indexed in Stage::ALL order
        &PROJECTIONS[self as usize]
    }

    /// `stages` deduplicated and sorted into canonical order
    pub fn canonical(stages: &[Stage]) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| stages.contains(stage))
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// How a relational cell becomes a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// SQLite 0/1
    Boolean,
    /// Normalized to `YYYY-MM-DD`
    Date,
    /// Scalar code, or the first element of a JSON array of codes
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyColumn {
    pub column: &'static str,
    pub property: &'static str,
    pub kind: ColumnKind,
}

macro_rules! prop {
    ($column:literal => $property:literal, $kind:ident) => {
        PropertyColumn {
            column: $column,
            property: $property,
            kind: ColumnKind::$kind,
        }
    };
}

/// Row → node. Columns are `[key, properties...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShape {
    pub label: &'static str,
    /// Key column; also the key property name on the node
    pub key: &'static str,
    pub properties: &'static [PropertyColumn],
}

/// A node referenced by an edge, matched on its key property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub label: &'static str,
    pub key: &'static str,
}

/// Row → edge. Columns are `[from key, to key]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeShape {
    pub edge_type: &'static str,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Node(NodeShape),
    Edge(EdgeShape),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub stage: Stage,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub shape: Shape,
}

impl Projection {
    pub fn query(&self) -> RowQuery {
        RowQuery {
            table: self.table,
            columns: self.columns,
        }
    }
}

const AUTHOR: Endpoint = Endpoint { label: "Author", key: "author_id" };
const BOOK: Endpoint = Endpoint { label: "Book", key: "book_id" };
const EDITION: Endpoint = Endpoint { label: "Edition", key: "edition_id" };
const ARCHIVE_DOCUMENT: Endpoint = Endpoint { label: "ArchiveDocument", key: "doc_id" };
const ARCHIVE_STATS: Endpoint = Endpoint { label: "ArchiveStats", key: "stat_id" };

pub static PROJECTIONS: [Projection; 9] = [
    Projection {
        stage: Stage::Authors,
        table: tables::AUTHOR,
        columns: &["author_id", "author_name"],
        shape: Shape::Node(NodeShape {
            label: AUTHOR.label,
            key: AUTHOR.key,
            properties: &[prop!("author_name" => "name", Text)],
        }),
    },
    Projection {
        stage: Stage::Books,
        table: tables::BOOK,
        columns: &["book_id", "title", "first_publish_year", "cover_edition_key", "has_fulltext"],
        shape: Shape::Node(NodeShape {
            label: BOOK.label,
            key: BOOK.key,
            properties: &[
                prop!("title" => "title", Text),
                prop!("first_publish_year" => "first_publish_year", Integer),
                prop!("cover_edition_key" => "cover_edition_key", Text),
                prop!("has_fulltext" => "has_fulltext", Boolean),
            ],
        }),
    },
    Projection {
        stage: Stage::Editions,
        table: tables::BOOK_EDITION,
        columns: &["edition_id", "edition_number", "edition_year", "language"],
        shape: Shape::Node(NodeShape {
            label: EDITION.label,
            key: EDITION.key,
            properties: &[
                prop!("edition_number" => "edition_number", Integer),
                prop!("edition_year" => "edition_year", Integer),
                prop!("language" => "language", Language),
            ],
        }),
    },
    Projection {
        stage: Stage::ArchiveDocuments,
        table: tables::ARCHIVE_DOCUMENT,
        columns: &[
            "doc_id", "identifier", "title", "creator", "year", "language", "downloads", "subject",
        ],
        shape: Shape::Node(NodeShape {
            label: ARCHIVE_DOCUMENT.label,
            key: ARCHIVE_DOCUMENT.key,
            properties: &[
                prop!("identifier" => "identifier", Text),
                prop!("title" => "title", Text),
                prop!("creator" => "creator", Text),
                prop!("year" => "year", Integer),
                prop!("language" => "language", Language),
                prop!("downloads" => "downloads", Integer),
                prop!("subject" => "subject", Text),
            ],
        }),
    },
    Projection {
        stage: Stage::ArchiveStats,
        table: tables::ARCHIVE_STATS,
        columns: &["stat_id", "last_access_date", "daily_downloads"],
        shape: Shape::Node(NodeShape {
            label: ARCHIVE_STATS.label,
            key: ARCHIVE_STATS.key,
            properties: &[
                prop!("last_access_date" => "last_access_date", Date),
                prop!("daily_downloads" => "daily_downloads", Integer),
            ],
        }),
    },
    Projection {
        stage: Stage::Wrote,
        table: tables::BOOK_AUTHOR,
        columns: &["author_id", "book_id"],
        shape: Shape::Edge(EdgeShape {
            edge_type: "WROTE",
            from: AUTHOR,
            to: BOOK,
        }),
    },
    Projection {
        stage: Stage::HasEdition,
        table: tables::BOOK_EDITION,
        columns: &["book_id", "edition_id"],
        shape: Shape::Edge(EdgeShape {
            edge_type: "HAS_EDITION",
            from: BOOK,
            to: EDITION,
        }),
    },
    Projection {
        stage: Stage::HasStats,
        table: tables::ARCHIVE_STATS,
        columns: &["doc_id", "stat_id"],
        shape: Shape::Edge(EdgeShape {
            edge_type: "HAS_STATS",
            from: ARCHIVE_DOCUMENT,
            to: ARCHIVE_STATS,
        }),
    },
    Projection {
        stage: Stage::LinkedTo,
        table: tables::BOOK_ARCHIVE_LINK,
        columns: &["book_id", "doc_id"],
        shape: Shape::Edge(EdgeShape {
            edge_type: "LINKED_TO",
            from: BOOK,
            to: ARCHIVE_DOCUMENT,
        }),
    },
];
