// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ACI Image Builder
//!
//! Drives `acbuild` (and `docker2aci` for debian based builders) to produce
//! the shared base image, per-component images and the source builder images.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Implements `ImageBuilder` on top of acbuild and gpg
//!
//! Base and builder images are cached in the workspace `containers_dir` and
//! only built when missing. Component images are always rebuilt; a new image
//! invalidates its old detached signature.

use crate::domain::component::{
    BaseImage, BaseStep, ComponentDescriptor, DerivedBase, ASSET_DIR, CONFIG_DIR, KEY_DIR,
};
use crate::domain::config::ContainerConfig;
use crate::domain::container::{ContainerError, ImageBuilder};
use crate::domain::shell::{Script, ScriptRunner};
use crate::domain::source::TargetOs;
use crate::domain::workspace::{NodeLayout, Workspace};
use crate::infrastructure::files_under;
use crate::infrastructure::template_engine::TemplateEngine;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

const ALPINE_IMAGE: &str = "quay.io/coreos/alpine-sh";
const SHARED_BASE: &str = "susi-base";

const ALPINE_TOOLCHAIN: &[BaseStep] = &[
    BaseStep::Run("mkdir -p /etc/apk"),
    BaseStep::Run("/bin/sh -c \"echo -en 'http://dl-4.alpinelinux.org/alpine/v3.3/main\\n@community http://dl-4.alpinelinux.org/alpine/v3.3/community\\n@testing http://dl-4.alpinelinux.org/alpine/edge/testing\\n' > /etc/apk/repositories\""),
    BaseStep::Run("apk update"),
    BaseStep::Run("apk add gcc g++ make cmake git perl python py-lxml openssl-dev linux-headers boost-dev mosquitto-dev leveldb-dev@testing go@community"),
];

const DEBIAN_TOOLCHAIN: &[BaseStep] = &[
    BaseStep::Run("apt-get --yes update"),
    BaseStep::Run("apt-get --yes install cmake make gcc g++ git libssl-dev libboost-all-dev libmosquitto-dev libmosquittopp-dev libleveldb-dev golang"),
    BaseStep::Run("apt-get clean"),
];

const ARMHF_TOOLCHAIN: &[BaseStep] = &[
    BaseStep::Run("dpkg --add-architecture armhf"),
    BaseStep::Run("apt-get --yes update"),
    BaseStep::Run("apt-get --yes install crossbuild-essential-armhf cmake make git libssl-dev:armhf libboost-all-dev:armhf libmosquitto-dev:armhf libmosquittopp-dev:armhf libleveldb-dev:armhf"),
    BaseStep::Run("apt-get clean"),
];

#[derive(Serialize)]
struct StepContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env_value: Option<&'a str>,
}

impl<'a> From<&'a BaseStep> for StepContext<'a> {
    fn from(step: &'a BaseStep) -> Self {
        match step {
            BaseStep::Run(cmd) => Self {
                run: Some(*cmd),
                env_key: None,
                env_value: None,
            },
            BaseStep::Env(key, value) => Self {
                run: None,
                env_key: Some(*key),
                env_value: Some(*value),
            },
        }
    }
}

#[derive(Serialize)]
struct Mount<'a> {
    name: &'a str,
    path: &'a str,
}

#[derive(Serialize)]
struct DerivedContext<'a> {
    containers_dir: &'a Path,
    image_name: String,
    image: &'a Path,
    parent: Option<&'a Path>,
    from: &'a str,
    steps: Vec<StepContext<'a>>,
    mounts: Vec<Mount<'a>>,
    exec: Option<String>,
}

#[derive(Serialize)]
struct FileCopy {
    src: PathBuf,
    dest: String,
}

#[derive(Serialize)]
struct Port<'a> {
    name: &'a str,
    protocol: &'a str,
    port: u16,
}

#[derive(Serialize)]
struct ComponentContext<'a> {
    base_image: &'a Path,
    image_name: String,
    copies: Vec<FileCopy>,
    ports: Vec<Port<'a>>,
    exec: &'a str,
    image: &'a Path,
    signature: PathBuf,
}

pub struct AciBuilder {
    workspace: Workspace,
    config: ContainerConfig,
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl AciBuilder {
    pub fn new(
        workspace: Workspace,
        config: ContainerConfig,
        runner: Arc<dyn ScriptRunner>,
        templates: Arc<TemplateEngine>,
    ) -> Self {
        Self {
            workspace,
            config,
            runner,
            templates,
        }
    }

    fn cached_image(&self, name: &str) -> PathBuf {
        self.workspace
            .containers_dir
            .join(format!("{}-{}.aci", name, self.config.arch_suffix))
    }

    fn image_name(&self, name: &str) -> String {
        format!("{}/{}", self.config.image_prefix, name)
    }

    async fn run_acbuild(&self, label: String, body: String) -> Result<(), ContainerError> {
        self.runner
            .run(Script::new(label.clone(), body).as_root())
            .await
            .map_err(|e| {
                error!(label = %label, "Image build failed: {}", e);
                ContainerError::from(e)
            })?;
        Ok(())
    }

    async fn sign(&self, image: &Path, passphrase: &str) -> Result<(), ContainerError> {
        let body = self.templates.render("gpg-sign", &serde_json::json!({ "image": image }))?;
        info!(image = %image.display(), "Signing image");
        self.runner
            .run(Script::new("gpg sign", body).with_stdin(passphrase))
            .await?;
        Ok(())
    }

    async fn ensure_derived(&self, base: &DerivedBase) -> Result<PathBuf, ContainerError> {
        let image = self.cached_image(base.name);
        if image.is_file() {
            debug!(image = %image.display(), "Base image cached");
            return Ok(image);
        }

        let parent = if base.on_shared_base {
            self.build_base_image().await?;
            Some(self.cached_image(SHARED_BASE))
        } else {
            None
        };

        let body = self.templates.render(
            "acbuild-derived",
            &DerivedContext {
                containers_dir: &self.workspace.containers_dir,
                image_name: self.image_name(base.name),
                image: &image,
                parent: parent.as_deref(),
                from: ALPINE_IMAGE,
                steps: base.steps.iter().map(StepContext::from).collect(),
                mounts: Vec::new(),
                exec: None,
            },
        )?;

        info!(image = %image.display(), "Building base image {}", base.name);
        self.run_acbuild(format!("acbuild {}", base.name), body).await?;
        Ok(image)
    }

    async fn base_image(&self, base: BaseImage) -> Result<PathBuf, ContainerError> {
        match base {
            BaseImage::Shared => {
                self.build_base_image().await?;
                Ok(self.cached_image(SHARED_BASE))
            }
            BaseImage::Derived(derived) => self.ensure_derived(derived).await,
        }
    }

    /// Debian root filesystem converted from the docker hub image
    async fn debian_rootfs(&self, release: &str) -> Result<PathBuf, ContainerError> {
        let image = self.workspace.containers_dir.join(format!("debian-{}.aci", release));
        if image.is_file() {
            return Ok(image);
        }
        let body = self.templates.render(
            "docker2aci",
            &serde_json::json!({
                "containers_dir": self.workspace.containers_dir,
                "docker_image": format!("docker://debian:{}", release),
                "converted": format!("library-debian-{}.aci", release),
                "image": image,
            }),
        )?;
        info!(release, "Converting debian docker image");
        self.run_acbuild(format!("docker2aci debian:{}", release), body).await?;
        Ok(image)
    }

    fn component_copies(
        &self,
        node: &NodeLayout,
        hosts_file: &Path,
        component: &ComponentDescriptor,
    ) -> Result<Vec<FileCopy>, ContainerError> {
        let name = component.name();
        let keys = node.key_store();
        let mut copies = Vec::new();

        if component.recipe.bus_binary {
            copies.push(FileCopy {
                src: self.workspace.build_dir.join("alpine").join("bin").join(name),
                dest: format!("/usr/local/bin/{}", name),
            });
        }
        for (src, dest) in component.recipe.source_files {
            copies.push(FileCopy {
                src: self.workspace.source_dir.join(src),
                dest: (*dest).to_string(),
            });
        }
        copies.push(FileCopy {
            src: keys.certificate(name),
            dest: format!("{}/{}.crt", KEY_DIR, name),
        });
        copies.push(FileCopy {
            src: keys.private_key(name),
            dest: format!("{}/{}.key", KEY_DIR, name),
        });
        if let Some(file) = component.config_file_name() {
            let config = node.configs_dir().join(&file);
            if config.is_file() {
                copies.push(FileCopy {
                    src: config,
                    dest: format!("{}/{}", CONFIG_DIR, file),
                });
            }
        }

        let assets = node.assets_dir();
        for (src, relative) in files_under(&assets).map_err(|e| ContainerError::io(&assets, e))? {
            copies.push(FileCopy {
                src,
                dest: format!("{}/{}", ASSET_DIR, relative.display()),
            });
        }
        let foreign = node.foreign_keys_dir();
        for (src, relative) in files_under(&foreign).map_err(|e| ContainerError::io(&foreign, e))? {
            copies.push(FileCopy {
                src,
                dest: format!("{}/{}", KEY_DIR, relative.display()),
            });
        }

        copies.push(FileCopy {
            src: hosts_file.to_path_buf(),
            dest: "/etc/hosts".to_string(),
        });
        Ok(copies)
    }
}

/// Toolchain steps, mounts and build command for a builder image
fn builder_recipe(os: TargetOs) -> Option<(&'static [BaseStep], String)> {
    let install_gowebstack = "GOPATH=/out go get github.com/webvariants/susi-gowebstack";
    match os {
        TargetOs::Native => None,
        TargetOs::Alpine => Some((
            ALPINE_TOOLCHAIN,
            format!("/bin/sh -c \"cd /out && cmake /susi && make -j8 && {}\"", install_gowebstack),
        )),
        TargetOs::DebianStable | TargetOs::DebianTesting => Some((
            DEBIAN_TOOLCHAIN,
            format!("/bin/sh -c \"cd /out && cmake /susi && make -j8 package && {}\"", install_gowebstack),
        )),
        TargetOs::Armv6 | TargetOs::Armv7 => {
            let march = os.arm_march().unwrap_or("armv7-a");
            Some((
                ARMHF_TOOLCHAIN,
                format!(
                    "/bin/sh -c \"cd /out && CC=arm-linux-gnueabihf-gcc CXX=arm-linux-gnueabihf-g++ CFLAGS=-march={m} CXXFLAGS=-march={m} cmake -DCPACK_DEBIAN_PACKAGE_ARCHITECTURE=armhf /susi && make -j8 package\"",
                    m = march
                ),
            ))
        }
    }
}

#[async_trait]
impl ImageBuilder for AciBuilder {
    async fn build_base_image(&self) -> Result<(), ContainerError> {
        let image = self.cached_image(SHARED_BASE);
        if image.is_file() {
            debug!(image = %image.display(), "Shared base image cached");
            return Ok(());
        }

        let body = self.templates.render(
            "acbuild-base",
            &serde_json::json!({
                "containers_dir": self.workspace.containers_dir,
                "image_name": self.image_name(SHARED_BASE),
                "lib_dir": self.workspace.build_dir.join("alpine").join("lib"),
                "image": image,
            }),
        )?;

        info!(image = %image.display(), "Building shared base image");
        self.run_acbuild("acbuild susi-base".to_string(), body).await
    }

    async fn build_component_image(
        &self,
        node: &NodeLayout,
        hosts: &str,
        component: &ComponentDescriptor,
        passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError> {
        let name = component.name();
        let image = node.image_file(name, &self.config.arch_suffix);
        if !image.is_file() && passphrase.is_none() {
            return Err(ContainerError::PassphraseRequired(image));
        }

        let base = self.base_image(component.recipe.base).await?;

        let hosts_file = self
            .workspace
            .containers_dir
            .join(format!("{}.hosts", node.id));
        tokio::fs::create_dir_all(&self.workspace.containers_dir)
            .await
            .map_err(|e| ContainerError::io(&self.workspace.containers_dir, e))?;
        tokio::fs::write(&hosts_file, hosts)
            .await
            .map_err(|e| ContainerError::io(&hosts_file, e))?;

        let containers = node.containers_dir();
        tokio::fs::create_dir_all(&containers)
            .await
            .map_err(|e| ContainerError::io(&containers, e))?;

        let mut signature = image.clone().into_os_string();
        signature.push(".asc");

        let body = self.templates.render(
            "acbuild-component",
            &ComponentContext {
                base_image: &base,
                image_name: self.image_name(name),
                copies: self.component_copies(node, &hosts_file, component)?,
                ports: component
                    .recipe
                    .ports
                    .iter()
                    .map(|p| Port {
                        name: p.name,
                        protocol: p.protocol,
                        port: p.port,
                    })
                    .collect(),
                exec: component.start_command,
                image: &image,
                signature: PathBuf::from(signature),
            },
        )?;

        info!(node = %node.id, component = name, "Building component image");
        self.run_acbuild(format!("acbuild {}", name), body).await?;

        if let Some(passphrase) = passphrase {
            self.sign(&image, passphrase).await?;
        }
        Ok(image)
    }

    async fn build_builder_image(
        &self,
        os: TargetOs,
        passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError> {
        let (steps, exec) = builder_recipe(os).ok_or(ContainerError::NoBuilderImage(os))?;
        let builder = format!("susi-builder-{}", os);
        let image = self.cached_image(&builder);
        let mut signature = image.clone().into_os_string();
        signature.push(".asc");
        let signature = PathBuf::from(signature);

        if image.is_file() {
            debug!(image = %image.display(), "Builder image cached");
        } else {
            if passphrase.is_none() {
                return Err(ContainerError::PassphraseRequired(image));
            }

            let parent = match os.debian_release() {
                Some(release) => Some(self.debian_rootfs(release).await?),
                None => None,
            };

            let body = self.templates.render(
                "acbuild-derived",
                &DerivedContext {
                    containers_dir: &self.workspace.containers_dir,
                    image_name: self.image_name(&builder),
                    image: &image,
                    parent: parent.as_deref(),
                    from: ALPINE_IMAGE,
                    steps: steps.iter().map(StepContext::from).collect(),
                    mounts: vec![
                        Mount { name: "susi", path: "/susi" },
                        Mount { name: "out", path: "/out" },
                    ],
                    exec: Some(exec),
                },
            )?;

            info!(os = %os, "Building builder image");
            self.run_acbuild(format!("acbuild {}", builder), body).await?;
        }

        if let (Some(passphrase), false) = (passphrase, signature.is_file()) {
            self.sign(&image, passphrase).await?;
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_recipes() {
        assert!(builder_recipe(TargetOs::Native).is_none());
        let (steps, exec) = builder_recipe(TargetOs::Armv6).unwrap();
        assert!(exec.contains("-march=armv6"));
        assert_eq!(steps[0], BaseStep::Run("dpkg --add-architecture armhf"));
        let (_, exec) = builder_recipe(TargetOs::DebianTesting).unwrap();
        assert!(exec.contains("make -j8 package"));
    }
}
