// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Node Provisioning
//!
//! Creates nodes, adds components to them (certificates, unit files,
//! configs, peer links) and pushes the result to a target host.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Compose registry, node store, certificate authority and deployer
//!
//! Every input is validated before the first file is written or the first
//! external tool runs, so a rejected `add` leaves the workspace untouched.

use crate::domain::component::{Component, ComponentDescriptor, ComponentRegistry, Peer, RegistryError};
use crate::domain::container::ContainerError;
use crate::domain::deploy::{DeployBundle, DeployError, DeployTarget, Deployer};
use crate::domain::node::{check_field, Node, NodeError, NodeId};
use crate::domain::pki::{CertificateAuthority, KeyStore, PkiError};
use crate::domain::shell::{Script, ScriptRunner, ShellError};
use crate::domain::workspace::{NodeLayout, Workspace};
use crate::infrastructure::node_store::{NodeStore, NodeStoreError};
use crate::infrastructure::template_engine::TemplateEngine;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_NODE_IP: &str = "127.0.0.1";

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] NodeStoreError),

    #[error(transparent)]
    Pki(#[from] PkiError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("Directory of node '{node}' is missing at {path}; run `susi-dev create {node}` again")]
    MissingNodeDir { node: String, path: PathBuf },

    #[error("Node '{0}' has no components; add one with `susi-dev add`")]
    NoComponents(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisioningError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisioningError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Node this component links to
    pub connect_to: Option<NodeId>,
    /// Reachable address of `connect_to`
    pub address: Option<String>,
}

/// Files written by [`ProvisioningService::add_component`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub unit_file: PathBuf,
    pub config_file: Option<PathBuf>,
    pub foreign_keys: Vec<PathBuf>,
    pub dh_params: Option<PathBuf>,
}

pub struct ProvisioningService {
    registry: Arc<ComponentRegistry>,
    workspace: Workspace,
    store: NodeStore,
    ca: Arc<dyn CertificateAuthority>,
    runner: Arc<dyn ScriptRunner>,
    deployer: Arc<dyn Deployer>,
    templates: Arc<TemplateEngine>,
}

impl ProvisioningService {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        workspace: Workspace,
        ca: Arc<dyn CertificateAuthority>,
        runner: Arc<dyn ScriptRunner>,
        deployer: Arc<dyn Deployer>,
        templates: Arc<TemplateEngine>,
    ) -> Self {
        let store = NodeStore::new(&workspace.nodes_file);
        Self {
            registry,
            workspace,
            store,
            ca,
            runner,
            deployer,
            templates,
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Create (or re-create) a node: its certificate authority, its directory
    /// tree and its entry in the node table. Runtime ids of an existing
    /// entry survive.
    pub async fn create_node(
        &self,
        id: &NodeId,
        ip: Option<&str>,
        fqdn: Option<&str>,
    ) -> Result<Node, ProvisioningError> {
        if let Some(ip) = ip {
            check_field("ip", ip)?;
        }
        if let Some(fqdn) = fqdn {
            check_field("fqdn", fqdn)?;
        }
        let layout = self.workspace.node(id);

        self.ca.init(&layout.pki_dir()).await?;
        for dir in [
            layout.configs_dir(),
            layout.assets_dir(),
            layout.foreign_keys_dir(),
            layout.containers_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| ProvisioningError::io(&dir, e))?;
        }

        let mut table = self.store.load_or_default();
        let node = match table.get(id) {
            Some(existing) => Node {
                ip: ip.map(str::to_string).unwrap_or_else(|| existing.ip.clone()),
                fqdn: fqdn.map(str::to_string).unwrap_or_else(|| existing.fqdn.clone()),
                ..existing.clone()
            },
            None => Node::new(
                id.clone(),
                ip.unwrap_or(DEFAULT_NODE_IP),
                fqdn.unwrap_or(id.as_str()),
            ),
        };
        table.set(node.clone());
        self.store.save(&table)?;

        info!(node = %id, ip = %node.ip, fqdn = %node.fqdn, "Node created");
        Ok(node)
    }

    /// Add `component` to `node`
    pub async fn add_component(
        &self,
        node_id: &NodeId,
        component: &str,
        options: AddOptions,
    ) -> Result<AddReport, ProvisioningError> {
        let table = self.store.load_or_default();
        table.require(node_id)?;
        let layout = self.existing_layout(node_id)?;
        let descriptor = self.registry.descriptor(component)?;

        let peer = match &options.connect_to {
            Some(peer_id) => {
                table.require(peer_id)?;
                self.existing_layout(peer_id)?;
                Some(Peer::new(peer_id.as_str(), options.address.clone()))
            }
            None => None,
        };

        let config = self
            .registry
            .render_config(node_id.as_str(), descriptor.name(), peer.as_ref())?;
        let unit = self.registry.render_unit_file(descriptor.name())?;

        let name = descriptor.name();
        let pki_dir = layout.pki_dir();
        self.ca.issue(&pki_dir, name).await?;

        let mut report = AddReport {
            unit_file: layout.unit_file(name),
            ..AddReport::default()
        };
        write_file(&report.unit_file, &unit).await?;

        if !config.is_empty() {
            if let Some(file_name) = descriptor.config_file_name() {
                let path = layout.configs_dir().join(file_name);
                write_file(&path, &config).await?;
                report.config_file = Some(path);
            }
        }

        if let Some(peer_id) = &options.connect_to {
            report.foreign_keys = self.link(&layout, peer_id).await?;
        }

        if descriptor.component == Component::VpnServer {
            self.ca.generate_dh(&pki_dir).await?;
            report.dh_params = Some(layout.key_store().dh_params());
        }

        self.run_provisioning_hook(&layout, descriptor).await?;

        info!(node = %node_id, component = name, "Component added");
        Ok(report)
    }

    /// Issue a certificate for `node` in the peer's authority and copy it,
    /// with the peer's CA certificate, into the node's foreign keys.
    async fn link(&self, node: &NodeLayout, peer_id: &NodeId) -> Result<Vec<PathBuf>, ProvisioningError> {
        let peer = self.workspace.node(peer_id);
        let peer_pki = peer.pki_dir();
        let peer_store = KeyStore::new(&peer_pki);
        let identity = crate::domain::component::link_identity(node.id.as_str(), peer_id.as_str());

        self.ca.issue(&peer_pki, node.id.as_str()).await?;

        let foreign = node.foreign_keys_dir();
        tokio::fs::create_dir_all(&foreign)
            .await
            .map_err(|e| ProvisioningError::io(&foreign, e))?;

        let copies = [
            (peer_store.certificate(node.id.as_str()), foreign.join(format!("{}.crt", identity))),
            (peer_store.private_key(node.id.as_str()), foreign.join(format!("{}.key", identity))),
            (peer_store.ca_certificate(), foreign.join(format!("{}.ca.crt", peer_id))),
        ];

        let mut written = Vec::with_capacity(copies.len());
        for (src, dest) in copies {
            tokio::fs::copy(&src, &dest)
                .await
                .map_err(|e| ProvisioningError::io(&src, e))?;
            written.push(dest);
        }
        info!(node = %node.id, peer = %peer_id, "Linked node to peer");
        Ok(written)
    }

    async fn run_provisioning_hook(
        &self,
        layout: &NodeLayout,
        descriptor: &ComponentDescriptor,
    ) -> Result<(), ProvisioningError> {
        let Some(template) = descriptor.provisioning_script else {
            return Ok(());
        };
        let label = format!("{} provisioning", descriptor.name());
        let body = self
            .templates
            .render_str(&label, template, &json!({ "assets_dir": layout.assets_dir() }))?;
        self.runner.run(Script::new(label, body)).await?;
        Ok(())
    }

    /// Push the node to `target`. Failures are logged and returned; local
    /// state is never modified.
    pub async fn deploy(&self, node_id: &NodeId, target: &DeployTarget) -> Result<DeployBundle, ProvisioningError> {
        self.store.load_or_default().require(node_id)?;
        let layout = self.existing_layout(node_id)?;

        match self.deployer.deploy(&layout, target).await {
            Ok(bundle) => {
                info!(node = %node_id, target = %target, units = bundle.units.len(), "Deploy finished");
                Ok(bundle)
            }
            Err(e) => {
                error!(node = %node_id, target = %target, "Deploy failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn pki_init(&self, dir: &Path) -> Result<KeyStore, ProvisioningError> {
        Ok(self.ca.init(dir).await?)
    }

    pub async fn pki_issue(&self, dir: &Path, name: &str) -> Result<(), ProvisioningError> {
        Ok(self.ca.issue(dir, name).await?)
    }

    pub fn installed_components(&self, node_id: &NodeId) -> Result<Vec<&ComponentDescriptor>, ProvisioningError> {
        let layout = self.existing_layout(node_id)?;
        installed_components(&self.registry, &layout)
    }

    fn existing_layout(&self, id: &NodeId) -> Result<NodeLayout, ProvisioningError> {
        let layout = self.workspace.node(id);
        if !layout.exists() {
            return Err(ProvisioningError::MissingNodeDir {
                node: id.to_string(),
                path: layout.root,
            });
        }
        Ok(layout)
    }
}

/// Components with a unit file in the node's `configs/`
pub fn installed_components<'r>(
    registry: &'r ComponentRegistry,
    layout: &NodeLayout,
) -> Result<Vec<&'r ComponentDescriptor>, ProvisioningError> {
    let dir = layout.configs_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ProvisioningError::io(&dir, e)),
    };

    let mut installed = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ProvisioningError::io(&dir, e))?.path();
        if path.extension().is_none_or(|ext| ext != "service") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match registry.descriptor(stem) {
            Ok(descriptor) => installed.push(descriptor),
            Err(_) => warn!(unit = %path.display(), "Ignoring unit file of unknown component"),
        }
    }
    installed.sort_by_key(|d| d.component);
    Ok(installed)
}

async fn write_file(path: &Path, content: &str) -> Result<(), ProvisioningError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProvisioningError::io(parent, e))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ProvisioningError::io(path, e))
}
