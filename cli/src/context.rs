// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Wires configuration, workspace and the external tool adapters into the
//! core services for a single invocation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use susi_dev_core::application::{ImageService, LifecycleService, ProvisioningService};
use susi_dev_core::domain::component::ComponentRegistry;
use susi_dev_core::domain::config::DevConfigManifest;
use susi_dev_core::domain::shell::ScriptRunner;
use susi_dev_core::domain::workspace::Workspace;
use susi_dev_core::infrastructure::acbuild::AciBuilder;
use susi_dev_core::infrastructure::easyrsa::EasyRsa;
use susi_dev_core::infrastructure::rkt::Rkt;
use susi_dev_core::infrastructure::setup::ToolchainInstaller;
use susi_dev_core::infrastructure::source::AciSourceBuilder;
use susi_dev_core::infrastructure::ssh_deploy::ScpDeployer;
use susi_dev_core::infrastructure::{BashRunner, TemplateEngine};

pub struct AppContext {
    pub config: DevConfigManifest,
    pub workspace: Workspace,
    pub registry: Arc<ComponentRegistry>,
    templates: Arc<TemplateEngine>,
    runner: Arc<dyn ScriptRunner>,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, workspace_root: &Path) -> Result<Self> {
        let root = std::path::absolute(workspace_root)
            .with_context(|| format!("Invalid workspace directory {:?}", workspace_root))?;

        let config = DevConfigManifest::load_or_default(config_path, &root)
            .context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;

        Self::from_config(config, root)
    }

    pub fn from_config(config: DevConfigManifest, root: PathBuf) -> Result<Self> {
        let templates = Arc::new(TemplateEngine::new().context("Failed to load script templates")?);
        let runner: Arc<dyn ScriptRunner> = Arc::new(BashRunner::new(&root));
        let registry = Arc::new(ComponentRegistry::new(config.bus_endpoint()));
        let workspace = config.workspace(root);

        Ok(Self {
            config,
            workspace,
            registry,
            templates,
            runner,
        })
    }

    pub fn provisioning(&self) -> ProvisioningService {
        let ca = Arc::new(EasyRsa::new(
            self.config.spec.pki.clone(),
            self.runner.clone(),
            self.templates.clone(),
        ));
        let deployer = Arc::new(ScpDeployer::new(
            self.config.spec.deploy.remote_staging_dir.clone(),
            self.runner.clone(),
            self.templates.clone(),
        ));
        ProvisioningService::new(
            self.registry.clone(),
            self.workspace.clone(),
            ca,
            self.runner.clone(),
            deployer,
            self.templates.clone(),
        )
    }

    fn image_builder(&self) -> Arc<AciBuilder> {
        Arc::new(AciBuilder::new(
            self.workspace.clone(),
            self.config.spec.container.clone(),
            self.runner.clone(),
            self.templates.clone(),
        ))
    }

    fn runtime(&self) -> Arc<Rkt> {
        Arc::new(Rkt::new(self.runner.clone(), self.templates.clone()))
    }

    pub fn images(&self) -> ImageService {
        ImageService::new(
            self.registry.clone(),
            self.workspace.clone(),
            self.config.spec.container.clone(),
            self.image_builder(),
            self.runtime(),
        )
    }

    pub fn lifecycle(&self) -> LifecycleService {
        LifecycleService::new(self.workspace.clone(), self.runtime())
    }

    pub fn source_builder(&self) -> AciSourceBuilder {
        AciSourceBuilder::new(
            self.workspace.clone(),
            self.config.spec.source.clone(),
            self.image_builder(),
            self.runner.clone(),
            self.templates.clone(),
        )
    }

    pub fn installer(&self) -> ToolchainInstaller {
        ToolchainInstaller::new(self.runner.clone(), self.templates.clone())
    }
}
