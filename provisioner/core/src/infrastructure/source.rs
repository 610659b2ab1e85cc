// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! git checkout and rkt based cross builds of the susi sources

use crate::domain::config::SourceConfig;
use crate::domain::container::ImageBuilder;
use crate::domain::shell::{Script, ScriptRunner};
use crate::domain::source::{SourceBuilder, SourceError, TargetOs};
use crate::domain::workspace::Workspace;
use crate::infrastructure::template_engine::TemplateEngine;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

pub struct AciSourceBuilder {
    workspace: Workspace,
    config: SourceConfig,
    images: Arc<dyn ImageBuilder>,
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl AciSourceBuilder {
    pub fn new(
        workspace: Workspace,
        config: SourceConfig,
        images: Arc<dyn ImageBuilder>,
        runner: Arc<dyn ScriptRunner>,
        templates: Arc<TemplateEngine>,
    ) -> Self {
        Self {
            workspace,
            config,
            images,
            runner,
            templates,
        }
    }

    fn require_checkout(&self) -> Result<(), SourceError> {
        if self.workspace.source_dir.is_dir() {
            Ok(())
        } else {
            Err(SourceError::NotCloned(self.workspace.source_dir.clone()))
        }
    }
}

#[async_trait]
impl SourceBuilder for AciSourceBuilder {
    async fn clone_source(&self) -> Result<(), SourceError> {
        if self.workspace.source_dir.is_dir() {
            info!(dir = %self.workspace.source_dir.display(), "Source already cloned");
            return Ok(());
        }

        let body = self.templates.render(
            "git-clone",
            &json!({
                "repository": self.config.repository,
                "source_dir": self.workspace.source_dir,
            }),
        )?;
        info!(repository = %self.config.repository, "Cloning sources");
        self.runner.run(Script::new("git clone", body)).await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<(), SourceError> {
        self.require_checkout()?;
        let body = self.templates.render(
            "git-checkout",
            &json!({ "source_dir": self.workspace.source_dir, "branch": branch }),
        )?;
        info!(branch, "Checking out branch");
        self.runner.run(Script::new("git checkout", body)).await?;
        Ok(())
    }

    async fn build(&self, os: TargetOs, passphrase: Option<&str>) -> Result<Option<PathBuf>, SourceError> {
        self.require_checkout()?;

        let out_dir = self.workspace.build_dir.join(os.name());
        let package = os
            .produces_package()
            .then(|| self.workspace.root.join(os.package_name()));

        let script = if os == TargetOs::Native {
            let body = self.templates.render(
                "native-build",
                &json!({
                    "source_dir": self.workspace.source_dir,
                    "out_dir": out_dir,
                    "package": package,
                }),
            )?;
            Script::new("native build", body)
        } else {
            let image = self.images.build_builder_image(os, passphrase).await?;
            let body = self.templates.render(
                "rkt-builder",
                &json!({
                    "source_dir": self.workspace.source_dir,
                    "out_dir": out_dir,
                    "image": image,
                    "package": package,
                }),
            )?;
            Script::new(format!("{} build", os), body).as_root()
        };

        info!(os = %os, out = %out_dir.display(), "Building sources");
        self.runner.run(script).await.map_err(|e| {
            error!(os = %os, "Build failed: {}", e);
            SourceError::from(e)
        })?;

        if let Some(package) = &package {
            if !package.is_file() {
                return Err(SourceError::NoPackage { os, dir: out_dir });
            }
            info!(package = %package.display(), "Package ready");
        }
        Ok(package)
    }
}
