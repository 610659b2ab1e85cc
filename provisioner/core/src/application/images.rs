// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Builds a node's component images and runs them unmanaged.

use crate::application::provisioning::{installed_components, ProvisioningError};
use crate::domain::component::{ComponentDescriptor, ComponentRegistry};
use crate::domain::config::ContainerConfig;
use crate::domain::container::{ContainerError, ContainerRuntime, ImageBuilder};
use crate::domain::node::NodeId;
use crate::domain::workspace::{NodeLayout, Workspace};
use crate::infrastructure::node_store::NodeStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct ImageService {
    registry: Arc<ComponentRegistry>,
    workspace: Workspace,
    store: NodeStore,
    config: ContainerConfig,
    builder: Arc<dyn ImageBuilder>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ImageService {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        workspace: Workspace,
        config: ContainerConfig,
        builder: Arc<dyn ImageBuilder>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        let store = NodeStore::new(&workspace.nodes_file);
        Self {
            registry,
            workspace,
            store,
            config,
            builder,
            runtime,
        }
    }

    /// Build images for `components`, or for every installed component when
    /// the list is empty.
    ///
    /// Images that do not exist yet must be signed, so a missing passphrase
    /// is reported before anything is built.
    pub async fn build(
        &self,
        node_id: &NodeId,
        components: &[String],
        passphrase: Option<&str>,
    ) -> Result<Vec<PathBuf>, ProvisioningError> {
        let table = self.store.load_or_default();
        table.require(node_id)?;
        let layout = self.layout(node_id)?;

        let selected: Vec<&ComponentDescriptor> = if components.is_empty() {
            installed_components(&self.registry, &layout)?
        } else {
            components
                .iter()
                .map(|name| self.registry.descriptor(name))
                .collect::<Result<_, _>>()?
        };
        if selected.is_empty() {
            return Err(ProvisioningError::NoComponents(node_id.to_string()));
        }

        if passphrase.is_none() {
            if let Some(missing) = selected
                .iter()
                .map(|d| layout.image_file(d.name(), &self.config.arch_suffix))
                .find(|image| !image.is_file())
            {
                return Err(ContainerError::PassphraseRequired(missing).into());
            }
        }

        self.builder.build_base_image().await?;

        let hosts = table.render_hosts();
        let mut images = Vec::with_capacity(selected.len());
        for descriptor in selected {
            let image = self
                .builder
                .build_component_image(&layout, &hosts, descriptor, passphrase)
                .await?;
            images.push(image);
        }

        info!(node = %node_id, images = images.len(), "Images built");
        Ok(images)
    }

    /// Run the node's images in the foreground, outside the node lifecycle
    pub async fn run(&self, node_id: &NodeId) -> Result<(), ProvisioningError> {
        self.store.load_or_default().require(node_id)?;
        let layout = self.layout(node_id)?;
        self.runtime.run_images(&layout).await?;
        Ok(())
    }

    fn layout(&self, id: &NodeId) -> Result<NodeLayout, ProvisioningError> {
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
