// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace and per-node directory layout

use crate::domain::node::NodeId;
use crate::domain::pki::KeyStore;
use std::path::{Path, PathBuf};

/// Resolved workspace paths. Every node lives in `<root>/<node-id>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub nodes_file: PathBuf,
    /// Cached base and builder images
    pub containers_dir: PathBuf,
    /// Compiled binaries and packages, one subdirectory per target OS
    pub build_dir: PathBuf,
    /// Source checkout
    pub source_dir: PathBuf,
}

impl Workspace {
    /// Relative paths are resolved against `root`; absolute paths are kept.
    pub fn new(
        root: impl Into<PathBuf>,
        nodes_file: impl AsRef<Path>,
        containers_dir: impl AsRef<Path>,
        build_dir: impl AsRef<Path>,
        source_dir: impl AsRef<Path>,
    ) -> Self {
        let root = root.into();
        Self {
            nodes_file: root.join(nodes_file),
            containers_dir: root.join(containers_dir),
            build_dir: root.join(build_dir),
            source_dir: root.join(source_dir),
            root,
        }
    }

    pub fn node(&self, id: &NodeId) -> NodeLayout {
        NodeLayout {
            id: id.clone(),
            root: self.root.join(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayout {
    pub id: NodeId,
    pub root: PathBuf,
}

impl NodeLayout {
    /// Directory handed to the certificate authority; easy-rsa adds its own `pki/`
    pub fn pki_dir(&self) -> PathBuf {
        self.root.join("pki")
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(self.pki_dir())
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.root.join("configs")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn foreign_keys_dir(&self) -> PathBuf {
        self.root.join("foreignKeys")
    }

    pub fn containers_dir(&self) -> PathBuf {
        self.root.join("containers")
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn unit_file(&self, component: &str) -> PathBuf {
        self.configs_dir().join(format!("{}.service", component))
    }

    pub fn image_file(&self, component: &str, arch_suffix: &str) -> PathBuf {
        self.containers_dir()
            .join(format!("{}-{}.aci", component, arch_suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_against_root() {
        let ws = Workspace::new("/srv/fleet", "nodes.txt", ".containers", "/var/build", ".susi-src");
        assert_eq!(ws.nodes_file, PathBuf::from("/srv/fleet/nodes.txt"));
        assert_eq!(ws.build_dir, PathBuf::from("/var/build"));

        let node = ws.node(&NodeId::new("nodeA").unwrap());
        assert_eq!(node.unit_file("susi-core"), PathBuf::from("/srv/fleet/nodeA/configs/susi-core.service"));
        assert_eq!(
            node.image_file("susi-mqtt", "latest-linux-amd64"),
            PathBuf::from("/srv/fleet/nodeA/containers/susi-mqtt-latest-linux-amd64.aci")
        );
        assert_eq!(
            node.key_store().certificate("susi-core"),
            PathBuf::from("/srv/fleet/nodeA/pki/pki/issued/susi-core.crt")
        );
    }
}
