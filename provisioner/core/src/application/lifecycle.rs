// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Start, stop and inspect a node's pod. The runtime ids live in the node
//! table, so a started node can be stopped from a later invocation.

use crate::domain::container::{ContainerError, ContainerRuntime, InstanceId, UnitId};
use crate::domain::node::{Node, NodeError, NodeId};
use crate::domain::workspace::Workspace;
use crate::infrastructure::node_store::{NodeStore, NodeStoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Node '{0}' is not running")]
    NotRunning(String),

    #[error("Node '{node}' is already running as unit {unit}")]
    AlreadyRunning { node: String, unit: UnitId },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Store(#[from] NodeStoreError),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

pub struct LifecycleService {
    workspace: Workspace,
    store: NodeStore,
    runtime: Arc<dyn ContainerRuntime>,
}

impl LifecycleService {
    pub fn new(workspace: Workspace, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let store = NodeStore::new(&workspace.nodes_file);
        Self {
            workspace,
            store,
            runtime,
        }
    }

    /// Prepare the node's pod and run it under a transient systemd unit
    pub async fn start(&self, id: &NodeId) -> Result<Node, LifecycleError> {
        let mut table = self.store.load_or_default();
        let node = table.require(id)?;
        if let Some(unit) = &node.unit_id {
            return Err(LifecycleError::AlreadyRunning {
                node: id.to_string(),
                unit: unit.clone(),
            });
        }
        let ip = node.ip.clone();
        let layout = self.workspace.node(id);

        let instance = self.runtime.prepare(&layout).await?;
        // Recorded before running so a failed run can still be inspected
        table.require_mut(id)?.instance_id = Some(instance.clone());
        self.store.save(&table)?;

        let unit = self.runtime.run_prepared(&instance, &ip).await?;
        let node = table.require_mut(id)?;
        node.unit_id = Some(unit.clone());
        let node = node.clone();
        self.store.save(&table)?;

        info!(node = %id, instance = %instance, unit = %unit, "Node started");
        Ok(node)
    }

    pub async fn stop(&self, id: &NodeId) -> Result<(), LifecycleError> {
        let mut table = self.store.load_or_default();
        let unit = self.running_unit(table.require(id)?)?;

        self.runtime.stop(&unit).await?;

        let node = table.require_mut(id)?;
        node.instance_id = None;
        node.unit_id = None;
        self.store.save(&table)?;

        info!(node = %id, unit = %unit, "Node stopped");
        Ok(())
    }

    pub async fn status(&self, id: &NodeId) -> Result<String, LifecycleError> {
        let table = self.store.load_or_default();
        let unit = self.running_unit(table.require(id)?)?;
        Ok(self.runtime.status(&unit).await?)
    }

    pub async fn logs(&self, id: &NodeId, follow: bool) -> Result<(), LifecycleError> {
        let table = self.store.load_or_default();
        let unit = self.running_unit(table.require(id)?)?;
        Ok(self.runtime.logs(&unit, follow).await?)
    }

    /// Open a shell in the node's pod
    pub async fn enter(&self, id: &NodeId) -> Result<(), LifecycleError> {
        let table = self.store.load_or_default();
        let node = table.require(id)?;
        let instance: InstanceId = node
            .instance_id
            .clone()
            .ok_or_else(|| LifecycleError::NotRunning(id.to_string()))?;
        Ok(self.runtime.enter(&instance).await?)
    }

    pub fn list(&self) -> Vec<Node> {
        self.store.load_or_default().iter().cloned().collect()
    }

    /// The runtime's own pod listing; empty when the runtime is unavailable
    pub async fn pods(&self) -> String {
        match self.runtime.list().await {
            Ok(pods) => pods,
            Err(e) => {
                warn!("Could not list pods: {}", e);
                String::new()
            }
        }
    }

    fn running_unit(&self, node: &Node) -> Result<UnitId, LifecycleError> {
        node.unit_id
            .clone()
            .ok_or_else(|| LifecycleError::NotRunning(node.id.to_string()))
    }
}
