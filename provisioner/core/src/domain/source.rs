// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Source checkout and cross builds

use crate::domain::container::ContainerError;
use crate::domain::shell::ShellError;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unknown target OS '{0}'. Expected one of: alpine, debian-stable, debian-testing, native, armv6, armv7")]
    UnknownOs(String),

    #[error("Source checkout {0} is missing; run `susi-dev source clone` first")]
    NotCloned(PathBuf),

    #[error("Build for {os} produced no package in {dir}")]
    NoPackage { os: TargetOs, dir: PathBuf },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Shell(#[from] ShellError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Alpine,
    DebianStable,
    DebianTesting,
    Native,
    Armv6,
    Armv7,
}

impl TargetOs {
    pub const ALL: [TargetOs; 6] = [
        TargetOs::Alpine,
        TargetOs::DebianStable,
        TargetOs::DebianTesting,
        TargetOs::Native,
        TargetOs::Armv6,
        TargetOs::Armv7,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TargetOs::Alpine => "alpine",
            TargetOs::DebianStable => "debian-stable",
            TargetOs::DebianTesting => "debian-testing",
            TargetOs::Native => "native",
            TargetOs::Armv6 => "armv6",
            TargetOs::Armv7 => "armv7",
        }
    }

    /// Debian release the builder image starts from
    pub fn debian_release(self) -> Option<&'static str> {
        match self {
            TargetOs::DebianStable | TargetOs::Armv6 | TargetOs::Armv7 => Some("stable"),
            TargetOs::DebianTesting => Some("testing"),
            TargetOs::Alpine | TargetOs::Native => None,
        }
    }

    /// `-march` passed to the arm cross compiler
    pub fn arm_march(self) -> Option<&'static str> {
        match self {
            TargetOs::Armv6 => Some("armv6"),
            TargetOs::Armv7 => Some("armv7-a"),
            _ => None,
        }
    }

    /// Whether the build emits a `.deb` that is copied to `susi-<os>.deb`
    pub fn produces_package(self) -> bool {
        !matches!(self, TargetOs::Alpine)
    }

    pub fn package_name(self) -> String {
        format!("susi-{}.deb", self.name())
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetOs {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetOs::ALL
            .into_iter()
            .find(|os| os.name() == s)
            .ok_or_else(|| SourceError::UnknownOs(s.to_string()))
    }
}

#[async_trait]
pub trait SourceBuilder: Send + Sync {
    /// Clone the repository; an existing checkout is left alone
    async fn clone_source(&self) -> Result<(), SourceError>;

    async fn checkout(&self, branch: &str) -> Result<(), SourceError>;

    /// Compile for `os`, returning the produced package if there is one
    async fn build(&self, os: TargetOs, passphrase: Option<&str>) -> Result<Option<PathBuf>, SourceError>;
}
