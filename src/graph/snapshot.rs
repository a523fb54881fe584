//! JSON snapshots of the graph store
//!
//! A path ending in `.gz` is written and read through gzip.

use super::edge::Edge;
use super::node::Node;
use super::store::{GraphError, GraphStore};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Bumped whenever the on-disk layout changes
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub format_version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            nodes,
            edges,
        }
    }

    pub fn write_to(&self, writer: impl Write) -> SnapshotResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn read_from(reader: impl Read) -> SnapshotResult<Self> {
        let snapshot: GraphSnapshot = serde_json::from_reader(reader)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.format_version));
        }
        Ok(snapshot)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

impl GraphStore {
    /// Write the store to `path`, replacing any existing file
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = BufWriter::new(File::create(path)?);
        let snapshot = self.to_snapshot();
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            snapshot.write_to(&mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            snapshot.write_to(&mut file)?;
            file.flush()?;
        }

        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "graph snapshot saved"
        );
        Ok(())
    }

    /// Load a store from `path`
    pub fn load_snapshot(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let snapshot = if is_gzip(path) {
            GraphSnapshot::read_from(GzDecoder::new(file))?
        } else {
            GraphSnapshot::read_from(file)?
        };

        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "graph snapshot loaded"
        );
        Ok(GraphStore::from_snapshot(snapshot)?)
    }

    /// Load `path` if it exists, otherwise start from an empty store
    pub fn open_snapshot(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(GraphStore::new())
        }
    }
}
