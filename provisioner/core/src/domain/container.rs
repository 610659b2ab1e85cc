// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Container images and runtime
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Ports for building ACI images and running them under systemd
//! - **Related:** `infrastructure::acbuild`, `infrastructure::rkt`

use crate::domain::component::ComponentDescriptor;
use crate::domain::shell::ShellError;
use crate::domain::source::TargetOs;
use crate::domain::workspace::NodeLayout;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pod uuid assigned by `rkt prepare`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transient systemd unit name without the `.service` suffix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Image {0} does not exist yet; pass --gpgpass so the new image can be signed")]
    PassphraseRequired(PathBuf),

    #[error("Could not parse output of '{command}': {output:?}")]
    UnexpectedOutput { command: String, output: String },

    #[error("No container images found in {0}; run `susi-dev container build` first")]
    NoImages(PathBuf),

    #[error("Target '{0}' builds on the host and has no builder image")]
    NoBuilderImage(TargetOs),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

impl ContainerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Builds and signs ACI images
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build the shared base image unless it is already cached
    async fn build_base_image(&self) -> Result<(), ContainerError>;

    /// Build `<node>/containers/<component>-<arch>.aci` and return its path
    async fn build_component_image(
        &self,
        node: &NodeLayout,
        hosts: &str,
        component: &ComponentDescriptor,
        passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError>;

    /// Build the toolchain image used to compile the sources for `os`
    async fn build_builder_image(
        &self,
        os: TargetOs,
        passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError>;
}

/// Runs a node's images as one pod under a transient systemd unit
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn prepare(&self, node: &NodeLayout) -> Result<InstanceId, ContainerError>;

    async fn run_prepared(&self, instance: &InstanceId, ip: &str) -> Result<UnitId, ContainerError>;

    /// Run the node's images in the foreground
    async fn run_images(&self, node: &NodeLayout) -> Result<(), ContainerError>;

    async fn stop(&self, unit: &UnitId) -> Result<(), ContainerError>;

    async fn status(&self, unit: &UnitId) -> Result<String, ContainerError>;

    async fn logs(&self, unit: &UnitId, follow: bool) -> Result<(), ContainerError>;

    async fn enter(&self, instance: &InstanceId) -> Result<(), ContainerError>;

    async fn list(&self) -> Result<String, ContainerError>;
}

/// Pod uuid printed by `rkt prepare`: the last non-empty line of its output
pub fn parse_instance_id(output: &str) -> Result<InstanceId, ContainerError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .filter(|line| !line.contains(char::is_whitespace))
        .map(InstanceId::new)
        .ok_or_else(|| ContainerError::UnexpectedOutput {
            command: "rkt prepare".to_string(),
            output: output.to_string(),
        })
}

/// Unit name from `systemd-run` output such as `Running as unit: run-r42.service`
pub fn parse_unit_id(output: &str) -> Result<UnitId, ContainerError> {
    output
        .lines()
        .filter_map(|line| line.split_once("unit:").map(|(_, rest)| rest))
        .filter_map(|rest| rest.split_whitespace().next())
        .find_map(|token| token.strip_suffix(".service"))
        .filter(|unit| !unit.is_empty())
        .map(UnitId::new)
        .ok_or_else(|| ContainerError::UnexpectedOutput {
            command: "systemd-run".to_string(),
            output: output.to_string(),
        })
}
