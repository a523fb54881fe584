//! Row → record mapping
//!
//! Pure: the same row and projection always give the same record.

use super::schema::{ColumnKind, EdgeShape, NodeShape, Projection, Shape};
use crate::graph::{EdgeType, NodeKey, NodeMerge, PropertyMap, PropertyValue, RelationshipMerge};
use crate::relational::{Cell, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Expected {expected} columns, row has {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Key column '{column}' is NULL")]
    MissingKey { column: &'static str },

    #[error("Key column '{column}' holds {found}, expected an integer")]
    InvalidKey {
        column: &'static str,
        found: &'static str,
    },

    #[error("Column '{column}' holds {found:?}, expected {expected}")]
    InvalidValue {
        column: &'static str,
        expected: &'static str,
        found: String,
    },
}

pub type MappingResult<T> = Result<T, MappingError>;

/// A mapped row, ready to merge
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node(NodeMerge),
    Edge(RelationshipMerge),
}

impl Record {
    /// The node key this record merges on, or the edge's source key
    pub fn key(&self) -> &NodeKey {
        match self {
            Record::Node(merge) => &merge.key,
            Record::Edge(merge) => &merge.from,
        }
    }
}

/// Map one row of `projection`'s query into a record
pub fn map_row(projection: &Projection, row: &Row) -> MappingResult<Record> {
    if row.cells.len() != projection.columns.len() {
        return Err(MappingError::ColumnCount {
            expected: projection.columns.len(),
            found: row.cells.len(),
        });
    }

    match &projection.shape {
        Shape::Node(shape) => map_node(shape, &row.cells).map(Record::Node),
        Shape::Edge(shape) => map_edge(shape, &row.cells).map(Record::Edge),
    }
}

fn map_node(shape: &NodeShape, cells: &[Cell]) -> MappingResult<NodeMerge> {
    let key = NodeKey::new(shape.label, shape.key, key_value(shape.key, &cells[0])?);

    let mut properties = PropertyMap::with_capacity(shape.properties.len());
    for (column, cell) in shape.properties.iter().zip(&cells[1..]) {
        let value = convert(column.column, column.kind, cell)?;
        properties.insert(column.property.to_string(), value);
    }

    Ok(NodeMerge { key, properties })
}

fn map_edge(shape: &EdgeShape, cells: &[Cell]) -> MappingResult<RelationshipMerge> {
    let from = NodeKey::new(shape.from.label, shape.from.key, key_value(shape.from.key, &cells[0])?);
    let to = NodeKey::new(shape.to.label, shape.to.key, key_value(shape.to.key, &cells[1])?);
    Ok(RelationshipMerge {
        edge_type: EdgeType::new(shape.edge_type),
        from,
        to,
    })
}

fn key_value(column: &'static str, cell: &Cell) -> MappingResult<i64> {
    match cell {
        Cell::Integer(id) => Ok(*id),
        Cell::Null => Err(MappingError::MissingKey { column }),
        other => Err(MappingError::InvalidKey {
            column,
            found: cell_type(other),
        }),
    }
}

fn cell_type(cell: &Cell) -> &'static str {
    match cell {
        Cell::Null => "NULL",
        Cell::Integer(_) => "an integer",
        Cell::Real(_) => "a real",
        Cell::Text(_) => "text",
        Cell::Blob(_) => "a blob",
    }
}

fn invalid(column: &'static str, expected: &'static str, cell: &Cell) -> MappingError {
    let found = match cell {
        Cell::Text(text) => text.clone(),
        Cell::Integer(i) => i.to_string(),
        Cell::Real(f) => f.to_string(),
        other => cell_type(other).to_string(),
    };
    MappingError::InvalidValue {
        column,
        expected,
        found,
    }
}

fn convert(column: &'static str, kind: ColumnKind, cell: &Cell) -> MappingResult<PropertyValue> {
    if let Cell::Null = cell {
        return Ok(PropertyValue::Null);
    }

    match kind {
        ColumnKind::Integer => match cell {
            Cell::Integer(i) => Ok(PropertyValue::Integer(*i)),
            Cell::Real(f) if f.fract() == 0.0 => Ok(PropertyValue::Integer(*f as i64)),
            Cell::Text(text) => text
                .trim()
                .parse()
                .map(PropertyValue::Integer)
                .map_err(|_| invalid(column, "an integer", cell)),
            _ => Err(invalid(column, "an integer", cell)),
        },
        ColumnKind::Text => match cell {
            Cell::Text(text) => Ok(PropertyValue::String(text.clone())),
            Cell::Integer(i) => Ok(PropertyValue::String(i.to_string())),
            _ => Err(invalid(column, "text", cell)),
        },
        ColumnKind::Boolean => match cell {
            Cell::Integer(0) => Ok(PropertyValue::Boolean(false)),
            Cell::Integer(1) => Ok(PropertyValue::Boolean(true)),
            Cell::Text(text) => match text.to_ascii_lowercase().as_str() {
                "true" | "t" => Ok(PropertyValue::Boolean(true)),
                "false" | "f" => Ok(PropertyValue::Boolean(false)),
                _ => Err(invalid(column, "a boolean", cell)),
            },
            _ => Err(invalid(column, "a boolean", cell)),
        },
        ColumnKind::Date => normalize_date(cell)
            .map(|date| PropertyValue::String(date.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| invalid(column, "a date", cell)),
        ColumnKind::Language => match cell {
            Cell::Text(text) => first_language(text)
                .map(|code| code.map_or(PropertyValue::Null, PropertyValue::String))
                .ok_or_else(|| invalid(column, "a language code", cell)),
            _ => Err(invalid(column, "a language code", cell)),
        },
    }
}

/// ISO date, ISO datetime, RFC 3339, or unix seconds
fn normalize_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.date_naive()),
        Cell::Text(text) => {
            let text = text.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.date())
                })
                .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
        }
        _ => None,
    }
}

/// `Some(None)` for an empty array; `None` when the text is malformed JSON
fn first_language(text: &str) -> Option<Option<String>> {
    if !text.trim_start().starts_with('[') {
        return Some(Some(text.to_string()));
    }
    let codes: Vec<String> = serde_json::from_str(text).ok()?;
    Some(codes.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::schema::Stage;

    fn row(cells: Vec<Cell>) -> Row {
        Row::new(1, cells)
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_map_book_node() {
        let record = map_row(
            Stage::Books.projection(),
            &row(vec![
                Cell::Integer(7),
                text("Physics 101"),
                Cell::Integer(2001),
                text("OL123"),
                Cell::Integer(1),
            ]),
        )
        .unwrap();

        let Record::Node(merge) = record else {
            panic!("expected a node record");
        };
        assert_eq!(merge.key, NodeKey::new("Book", "book_id", 7));
        assert_eq!(merge.properties["title"], PropertyValue::String("Physics 101".into()));
        assert_eq!(merge.properties["first_publish_year"], PropertyValue::Integer(2001));
        assert_eq!(merge.properties["has_fulltext"], PropertyValue::Boolean(true));
    }

    #[test]
    fn test_map_edge() {
        let record = map_row(Stage::Wrote.projection(), &row(vec![Cell::Integer(3), Cell::Integer(7)])).unwrap();
        assert_eq!(
            record,
            Record::Edge(RelationshipMerge {
                edge_type: EdgeType::new("WROTE"),
                from: NodeKey::new("Author", "author_id", 3),
                to: NodeKey::new("Book", "book_id", 7),
            })
        );
    }

    #[test]
    fn test_null_key_is_rejected() {
        let err = map_row(Stage::Authors.projection(), &row(vec![Cell::Null, text("Jane Doe")])).unwrap_err();
        assert_eq!(err, MappingError::MissingKey { column: "author_id" });

        let err = map_row(Stage::Wrote.projection(), &row(vec![text("3"), Cell::Integer(7)])).unwrap_err();
        assert!(matches!(err, MappingError::InvalidKey { column: "author_id", .. }));
    }

    #[test]
    fn test_date_normalization() {
        let projection = Stage::ArchiveStats.projection();
        for cell in [
            text("2024-03-01"),
            text("2024-03-01 08:15:00"),
            text("2024-03-01T08:15:00+00:00"),
            Cell::Integer(1_709_251_200),
        ] {
            let Record::Node(merge) = map_row(projection, &row(vec![Cell::Integer(1), cell, Cell::Null])).unwrap()
            else {
                panic!("expected a node record");
            };
            assert_eq!(merge.properties["last_access_date"], PropertyValue::String("2024-03-01".into()));
            assert!(merge.properties["daily_downloads"].is_null());
        }

        let err = map_row(projection, &row(vec![Cell::Integer(1), text("March"), Cell::Null])).unwrap_err();
        assert!(matches!(err, MappingError::InvalidValue { column: "last_access_date", .. }));
    }

    #[test]
    fn test_language_takes_first_of_list() {
        let projection = Stage::Editions.projection();
        let map = |language: Cell| {
            match map_row(projection, &row(vec![Cell::Integer(1), Cell::Integer(2), Cell::Integer(2001), language])) {
                Ok(Record::Node(merge)) => Ok(merge.properties["language"].clone()),
                Ok(_) => panic!("expected a node record"),
                Err(e) => Err(e),
            }
        };

        assert_eq!(map(text("eng")).unwrap(), PropertyValue::String("eng".into()));
        assert_eq!(map(text(r#"["fre","eng"]"#)).unwrap(), PropertyValue::String("fre".into()));
        assert_eq!(map(text("[]")).unwrap(), PropertyValue::Null);
        assert!(map(text("[broken")).is_err());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let input = row(vec![Cell::Integer(9), text("Jane Doe")]);
        let projection = Stage::Authors.projection();
        assert_eq!(map_row(projection, &input), map_row(projection, &input));
    }

    #[test]
    fn test_column_count_mismatch() {
        let err = map_row(Stage::Authors.projection(), &row(vec![Cell::Integer(1)])).unwrap_err();
        assert_eq!(err, MappingError::ColumnCount { expected: 2, found: 1 });
    }
}
