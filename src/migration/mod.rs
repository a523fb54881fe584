//! Relational → graph migration
//!
//! Pipeline per stage:
//! - [`BatchReader`] pages rows out of the catalog
//! - [`map_row`] turns each row into a node or edge record
//! - [`ProjectionBuilder`] merges each batch into the graph target
//!
//! [`Migrator`] sequences the stages and collects a [`MigrationReport`].

pub mod batch;
pub mod config;
pub mod mapper;
pub mod orchestrator;
pub mod projection;
pub mod report;
pub mod schema;

use crate::graph::SnapshotError;
use crate::linker::LinkError;
use crate::relational::SourceError;
use std::path::PathBuf;
use thiserror::Error;

pub use batch::{BatchReader, DEFAULT_BATCH_SIZE};
pub use config::{ConfigError, ConfigResult, MigrationConfig};
pub use mapper::{map_row, MappingError, MappingResult, Record};
pub use orchestrator::{link_and_migrate, migrate, migrate_into, Migrator};
pub use projection::{BatchCounts, ProjectionBuilder};
pub use report::{MigrationReport, RunStatus, StageReport, StageStatus};
pub use schema::{Projection, Stage, UnknownStage, PROJECTIONS};

/// Errors that abort a whole run
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Catalog database not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Catalog error: {0}")]
    Source(#[from] SourceError),

    #[error("Graph snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Linking failed: {0}")]
    Link(#[from] LinkError),
}

pub type MigrationResult<T> = Result<T, MigrationError>;
