// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote deployment port

use crate::domain::shell::ShellError;
use crate::domain::workspace::NodeLayout;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Invalid deploy target '{0}': expected [user@]host")]
    InvalidTarget(String),

    #[error("Transfer to {target} failed: {source}")]
    Transfer {
        target: String,
        #[source]
        source: ShellError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// An ssh destination, `[user@]host`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub user: Option<String>,
    pub host: String,
}

impl FromStr for DeployTarget {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeployError::InvalidTarget(s.to_string());
        if s.is_empty() || s.starts_with('-') || s.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(invalid());
        }
        match s.split_once('@') {
            Some((user, host)) if !user.is_empty() && !host.is_empty() && !host.contains('@') => {
                Ok(Self {
                    user: Some(user.to_string()),
                    host: host.to_string(),
                })
            }
            Some(_) => Err(invalid()),
            None => Ok(Self {
                user: None,
                host: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}@{}", user, self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// Files making up one node's deployment, relative paths already resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployBundle {
    pub keys: Vec<PathBuf>,
    pub configs: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
    /// Unit file names (`susi-core.service`), also contained in `configs`
    pub units: Vec<String>,
}

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Push the node's keys, configs and assets to `target` and restart its units
    async fn deploy(&self, node: &NodeLayout, target: &DeployTarget) -> Result<DeployBundle, DeployError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let target: DeployTarget = "pi@10.0.0.5".parse().unwrap();
        assert_eq!(target.user.as_deref(), Some("pi"));
        assert_eq!(target.host, "10.0.0.5");
        assert_eq!(target.to_string(), "pi@10.0.0.5");

        let bare: DeployTarget = "edge.lab".parse().unwrap();
        assert_eq!(bare.user, None);

        for bad in ["", "@host", "user@", "a@b@c", "-oProxyCommand=x", "host:/tmp", "two words"] {
            assert!(bad.parse::<DeployTarget>().is_err(), "{bad}");
        }
    }
}
