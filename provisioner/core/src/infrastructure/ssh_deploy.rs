// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Deployment over ssh/scp
//!
//! The bundle is collected here, in Rust, and handed to one rendered script
//! which stages it on the target and runs a single composed install command
//! there. Nothing on the local side is modified.

use crate::domain::component::{ASSET_DIR, CONFIG_DIR, KEY_DIR};
use crate::domain::deploy::{DeployBundle, DeployError, DeployTarget, Deployer};
use crate::domain::shell::{quote, Script, ScriptRunner};
use crate::domain::workspace::NodeLayout;
use crate::infrastructure::files_under;
use crate::infrastructure::template_engine::TemplateEngine;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

const UNIT_DIR: &str = "/etc/systemd/system";

/// Config extensions installed into the config directory
const CONFIG_EXTENSIONS: &[&str] = &["json", "ovpn", "conf"];

pub struct ScpDeployer {
    staging_dir: String,
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl ScpDeployer {
    /// `staging_dir` is relative to the remote user's home directory
    pub fn new(staging_dir: impl Into<String>, runner: Arc<dyn ScriptRunner>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            runner,
            templates,
        }
    }
}

fn relative_files(root: &Path, dir: &Path) -> Result<Vec<PathBuf>, DeployError> {
    let files = files_under(dir).map_err(|source| DeployError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(files
        .into_iter()
        .map(|(path, _)| path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path))
        .collect())
}

/// Gather the node's key material, configs, assets and unit names.
/// Paths are relative to the node directory.
pub fn collect_bundle(node: &NodeLayout) -> Result<DeployBundle, DeployError> {
    let root = &node.root;
    let store = node.key_store();
    let mut bundle = DeployBundle::default();

    bundle.keys.extend(
        relative_files(root, &store.private_dir())?
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|name| name != "ca.key")),
    );
    bundle.keys.extend(relative_files(root, &store.issued_dir())?);
    for extra in [store.ca_certificate(), store.dh_params()] {
        if extra.is_file() {
            bundle
                .keys
                .push(extra.strip_prefix(root).map(Path::to_path_buf).unwrap_or(extra));
        }
    }
    bundle.keys.extend(relative_files(root, &node.foreign_keys_dir())?);

    let configs_dir = node.configs_dir();
    for (path, relative) in files_under(&configs_dir).map_err(|source| DeployError::Io {
        path: configs_dir.clone(),
        source,
    })? {
        // Only the top level of configs/ is deployed
        if relative.components().count() != 1 {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "service") {
            bundle.units.push(relative.to_string_lossy().into_owned());
        }
        bundle.configs.push(Path::new("configs").join(relative));
    }

    let assets_dir = node.assets_dir();
    if assets_dir.is_dir() {
        let entries = std::fs::read_dir(&assets_dir).map_err(|source| DeployError::Io {
            path: assets_dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| DeployError::Io {
                path: assets_dir.clone(),
                source,
            })?;
            bundle.assets.push(Path::new("assets").join(entry.file_name()));
        }
        bundle.assets.sort();
    }

    Ok(bundle)
}

/// Remote command installing a staged bundle and restarting `units`
pub fn remote_install_command(staging_dir: &str, units: &[String]) -> String {
    let staging = quote(staging_dir);
    let mut steps = vec![format!("sudo mkdir -p {} {}", KEY_DIR, ASSET_DIR)];
    for ext in CONFIG_EXTENSIONS {
        steps.push(format!("(sudo cp {}/configs/*.{} {}/ || true)", staging, ext, CONFIG_DIR));
    }
    steps.push(format!("(sudo cp {}/configs/*.service {}/ || true)", staging, UNIT_DIR));
    steps.push(format!("(sudo cp {}/keys/* {}/ || true)", staging, KEY_DIR));
    steps.push(format!("(sudo cp -rf {}/assets/* {}/ || true)", staging, ASSET_DIR));
    steps.push("sudo systemctl daemon-reload".to_string());

    if !units.is_empty() {
        let units: Vec<String> = units.iter().map(|u| quote(u)).collect();
        let units = units.join(" ");
        steps.push(format!("sudo systemctl enable {}", units));
        steps.push(format!("sudo systemctl restart {}", units));
    }
    steps.join(" && ")
}

fn staging_prepare_command(staging_dir: &str) -> String {
    let staging = quote(staging_dir);
    format!(
        "rm -rf {s} && mkdir -p {s}/keys {s}/configs {s}/assets",
        s = staging
    )
}

#[async_trait]
impl Deployer for ScpDeployer {
    async fn deploy(&self, node: &NodeLayout, target: &DeployTarget) -> Result<DeployBundle, DeployError> {
        let bundle = collect_bundle(node)?;
        let target_str = target.to_string();
        let remote = |sub: &str| format!("{}:{}/{}/", target_str, self.staging_dir, sub);

        let body = self.templates.render(
            "deploy",
            &json!({
                "node_dir": node.root,
                "target": target_str,
                "prepare": staging_prepare_command(&self.staging_dir),
                "keys": bundle.keys,
                "keys_dest": remote("keys"),
                "configs": bundle.configs,
                "configs_dest": remote("configs"),
                "assets": bundle.assets,
                "assets_dest": remote("assets"),
                "install": remote_install_command(&self.staging_dir, &bundle.units),
            }),
        )?;

        info!(
            node = %node.id,
            target = %target,
            keys = bundle.keys.len(),
            configs = bundle.configs.len(),
            units = bundle.units.len(),
            "Deploying node"
        );

        self.runner
            .run(Script::new(format!("deploy {}", node.id), body))
            .await
            .map_err(|source| {
                error!(node = %node.id, target = %target, "Deploy failed: {}", source);
                DeployError::Transfer {
                    target: target_str.clone(),
                    source,
                }
            })?;

        Ok(bundle)
    }
}
