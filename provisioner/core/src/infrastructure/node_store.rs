// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Flat-file persistence for the node table
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the table, so a crash never leaves a half-written file behind.
//! There is no lock: two concurrent `susi-dev` invocations that both modify
//! the table race, and the last writer wins.

use crate::domain::node::NodeTable;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum NodeStoreError {
    #[error("Node table {0} does not exist")]
    NotFound(PathBuf),

    #[error("I/O error on node table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct NodeStore {
    path: PathBuf,
}

impl NodeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<NodeTable, NodeStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                let table = NodeTable::parse(&text);
                debug!(path = %self.path.display(), nodes = table.len(), "Loaded node table");
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(NodeStoreError::NotFound(self.path.clone()))
            }
            Err(source) => Err(NodeStoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Like [`NodeStore::load`], but any failure is logged and yields an empty table
    pub fn load_or_default(&self) -> NodeTable {
        self.load().unwrap_or_else(|e| {
            warn!("{}; starting with an empty node table", e);
            NodeTable::new()
        })
    }

    pub fn save(&self, table: &NodeTable) -> Result<(), NodeStoreError> {
        let io_err = |source| NodeStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(table.to_text().as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(path = %self.path.display(), nodes = table.len(), "Saved node table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::{InstanceId, UnitId};
    use crate::domain::node::{Node, NodeId};

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::new(dir.path().join("nodes.txt"));
        assert!(matches!(store.load(), Err(NodeStoreError::NotFound(_))));
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::new(dir.path().join("fleet").join("nodes.txt"));

        let mut table = NodeTable::new();
        let mut node = Node::new(NodeId::new("nodeA").unwrap(), "10.0.0.1", "a.lab");
        node.instance_id = Some(InstanceId::new("4c1e"));
        node.unit_id = Some(UnitId::new("run-r3"));
        table.set(node);
        table.set(Node::new(NodeId::new("nodeB").unwrap(), "10.0.0.2", "nodeB"));

        store.save(&table).unwrap();
        assert_eq!(store.load().unwrap(), table);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "10.0.0.1 nodeA a.lab 4c1e run-r3\n10.0.0.2 nodeB nodeB\n");
    }
}
