// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! rkt + systemd container runtime

use crate::domain::container::{
    parse_instance_id, parse_unit_id, ContainerError, ContainerRuntime, InstanceId, UnitId,
};
use crate::domain::shell::{quote, Script, ScriptRunner};
use crate::domain::workspace::NodeLayout;
use crate::infrastructure::template_engine::TemplateEngine;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// `systemctl status` exit code for a unit that is not active
const UNIT_INACTIVE: i32 = 3;

pub struct Rkt {
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl Rkt {
    pub fn new(runner: Arc<dyn ScriptRunner>, templates: Arc<TemplateEngine>) -> Self {
        Self { runner, templates }
    }

    async fn images(&self, node: &NodeLayout) -> Result<Vec<PathBuf>, ContainerError> {
        let dir = node.containers_dir();
        let mut images = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContainerError::NoImages(dir))
            }
            Err(e) => return Err(ContainerError::io(&dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ContainerError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "aci") {
                images.push(path);
            }
        }
        if images.is_empty() {
            return Err(ContainerError::NoImages(dir));
        }
        images.sort();
        Ok(images)
    }
}

#[async_trait]
impl ContainerRuntime for Rkt {
    async fn prepare(&self, node: &NodeLayout) -> Result<InstanceId, ContainerError> {
        let images = self.images(node).await?;
        let body = self.templates.render("rkt-prepare", &json!({ "images": images }))?;

        info!(node = %node.id, images = images.len(), "Preparing pod");
        let output = self
            .runner
            .run(Script::new("rkt prepare", body).as_root().captured())
            .await
            .map_err(|e| {
                error!(node = %node.id, "rkt prepare failed: {}", e);
                ContainerError::from(e)
            })?;
        parse_instance_id(&output.stdout)
    }

    async fn run_prepared(&self, instance: &InstanceId, ip: &str) -> Result<UnitId, ContainerError> {
        let body = self.templates.render(
            "rkt-run-prepared",
            &json!({
                "net": format!("--net=default:IP={}", ip),
                "instance": instance.as_str(),
            }),
        )?;

        info!(instance = %instance, ip, "Starting pod");
        let output = self
            .runner
            .run(Script::new("systemd-run", body).as_root().captured())
            .await?;
        // systemd-run reports the unit name on stderr
        parse_unit_id(&format!("{}\n{}", output.stderr, output.stdout))
    }

    async fn run_images(&self, node: &NodeLayout) -> Result<(), ContainerError> {
        let images = self.images(node).await?;
        let body = self.templates.render("rkt-run", &json!({ "images": images }))?;

        info!(node = %node.id, "Running pod in the foreground");
        self.runner
            .run(Script::new("rkt run", body).as_root().interactive())
            .await?;
        Ok(())
    }

    async fn stop(&self, unit: &UnitId) -> Result<(), ContainerError> {
        info!(unit = %unit, "Stopping unit");
        self.runner
            .run(Script::new("systemctl stop", format!("systemctl stop {}", quote(unit.as_str()))).as_root())
            .await?;
        Ok(())
    }

    async fn status(&self, unit: &UnitId) -> Result<String, ContainerError> {
        // Inactive units still print their status; only worse exit codes fail
        let body = format!(
            "systemctl status --no-pager {}; status=$?; [ \"$status\" -le {} ]",
            quote(unit.as_str()),
            UNIT_INACTIVE
        );
        let output = self
            .runner
            .run(Script::new("systemctl status", body).captured())
            .await?;
        Ok(output.stdout)
    }

    async fn logs(&self, unit: &UnitId, follow: bool) -> Result<(), ContainerError> {
        let follow = if follow { " --follow" } else { "" };
        self.runner
            .run(
                Script::new(
                    "journalctl",
                    format!("journalctl --no-pager -u {}{}", quote(unit.as_str()), follow),
                )
                .as_root()
                .interactive(),
            )
            .await?;
        Ok(())
    }

    async fn enter(&self, instance: &InstanceId) -> Result<(), ContainerError> {
        self.runner
            .run(
                Script::new("rkt enter", format!("rkt enter {}", quote(instance.as_str())))
                    .as_root()
                    .interactive(),
            )
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<String, ContainerError> {
        let output = self
            .runner
            .run(Script::new("rkt list", "rkt list").as_root().captured())
            .await?;
        Ok(output.stdout)
    }
}
