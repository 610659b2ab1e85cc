// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Developer Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing where
// the workspace keeps its files, which bus endpoint generated configs point
// at, and where the external tools are fetched from.

use crate::domain::component::BusEndpoint;
use crate::domain::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "susi.io/v1";
pub const KIND: &str = "DevConfig";

/// File name probed in the workspace root during discovery
pub const WORKSPACE_CONFIG_FILE: &str = "susi-dev.yaml";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfigManifest {
    /// API version (must be "susi.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "DevConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: DevConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfigSpec {
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub pki: PkiConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub container: ContainerConfig,
}

/// Workspace file locations, relative to the workspace root unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_nodes_file")]
    pub nodes_file: PathBuf,

    #[serde(default = "default_containers_dir")]
    pub containers_dir: PathBuf,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_addr")]
    pub addr: String,

    #[serde(default = "default_bus_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkiConfig {
    /// Release download base; the archive is `<url>/<version>/EasyRSA-<version>.tgz`
    #[serde(default = "default_easyrsa_url")]
    pub easyrsa_url: String,

    #[serde(default = "default_easyrsa_version")]
    pub easyrsa_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default = "default_branch")]
    pub default_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Staging directory on the target, relative to the remote user's home
    #[serde(default = "default_staging_dir")]
    pub remote_staging_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Prefix of every image name, e.g. `susi.io/susi-core`
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    #[serde(default = "default_arch_suffix")]
    pub arch_suffix: String,
}

fn default_nodes_file() -> PathBuf {
    PathBuf::from("nodes.txt")
}

fn default_containers_dir() -> PathBuf {
    PathBuf::from(".containers")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(".build")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".susi-src")
}

fn default_bus_addr() -> String {
    "localhost".to_string()
}

fn default_bus_port() -> u16 {
    4000
}

fn default_easyrsa_url() -> String {
    "https://github.com/OpenVPN/easy-rsa/releases/download".to_string()
}

fn default_easyrsa_version() -> String {
    "3.0.1".to_string()
}

fn default_repository() -> String {
    "https://github.com/webvariants/susi.git".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_staging_dir() -> String {
    ".susi-dev-temp".to_string()
}

fn default_image_prefix() -> String {
    "susi.io".to_string()
}

fn default_arch_suffix() -> String {
    "latest-linux-amd64".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            nodes_file: default_nodes_file(),
            containers_dir: default_containers_dir(),
            build_dir: default_build_dir(),
            source_dir: default_source_dir(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            addr: default_bus_addr(),
            port: default_bus_port(),
        }
    }
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            easyrsa_url: default_easyrsa_url(),
            easyrsa_version: default_easyrsa_version(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            default_branch: default_branch(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            remote_staging_dir: default_staging_dir(),
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image_prefix: default_image_prefix(),
            arch_suffix: default_arch_suffix(),
        }
    }
}

impl Default for DevConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "susi-dev".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: DevConfigSpec::default(),
        }
    }
}

impl PkiConfig {
    pub fn archive_url(&self) -> String {
        format!(
            "{}/{}/EasyRSA-{}.tgz",
            self.easyrsa_url.trim_end_matches('/'),
            self.easyrsa_version,
            self.easyrsa_version
        )
    }
}

impl DevConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover a configuration file using precedence order
    /// 1. SUSI_DEV_CONFIG environment variable
    /// 2. `<workspace>/susi-dev.yaml`
    /// 3. ~/.susi-dev/config.yaml
    /// 4. /etc/susi-dev/config.yaml
    pub fn discover_config(workspace_root: &Path) -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SUSI_DEV_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = workspace_root.join(WORKSPACE_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".susi-dev").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/susi-dev/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, falling back to defaults
    pub fn load_or_default(cli_path: Option<PathBuf>, workspace_root: &Path) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config(workspace_root) {
            Some(config_path) => {
                tracing::debug!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(&config_path).map_err(|e| {
                    anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e)
                })?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SUSI_DEV_NODES_FILE") {
            tracing::info!("Environment override: SUSI_DEV_NODES_FILE={}", val);
            self.spec.workspace.nodes_file = PathBuf::from(val);
        }

        if let Some(val) = lookup("SUSI_DEV_BUS_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: SUSI_DEV_BUS_PORT={}", port);
                    self.spec.bus.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SUSI_DEV_BUS_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.bus.port == 0 {
            anyhow::bail!("spec.bus.port must be non-zero");
        }

        if self.spec.source.repository.trim().is_empty() {
            anyhow::bail!("spec.source.repository cannot be empty");
        }

        if self.spec.deploy.remote_staging_dir.trim().is_empty() {
            anyhow::bail!("spec.deploy.remote_staging_dir cannot be empty");
        }

        Ok(())
    }

    pub fn workspace(&self, root: impl Into<PathBuf>) -> Workspace {
        let ws = &self.spec.workspace;
        Workspace::new(
            root,
            &ws.nodes_file,
            &ws.containers_dir,
            &ws.build_dir,
            &ws.source_dir,
        )
    }

    pub fn bus_endpoint(&self) -> BusEndpoint {
        BusEndpoint {
            addr: self.spec.bus.addr.clone(),
            port: self.spec.bus.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = DevConfigManifest::default();
        assert_eq!(manifest.api_version, "susi.io/v1");
        assert_eq!(manifest.kind, "DevConfig");
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.bus.port, 4000);
        assert_eq!(manifest.spec.workspace.nodes_file, PathBuf::from("nodes.txt"));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: susi.io/v1
kind: DevConfig
metadata:
  name: lab
spec:
  bus:
    port: 4100
  source:
    default_branch: develop
"#;
        let manifest = DevConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.bus.port, 4100);
        assert_eq!(manifest.spec.bus.addr, "localhost");
        assert_eq!(manifest.spec.source.default_branch, "develop");
        assert_eq!(manifest.spec.source.repository, "https://github.com/webvariants/susi.git");
        assert_eq!(manifest.spec.container.arch_suffix, "latest-linux-amd64");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut manifest = DevConfigManifest::default();
        manifest.metadata.name = "fleet".to_string();
        manifest.spec.deploy.remote_staging_dir = ".staging".to_string();

        let yaml = manifest.to_yaml().unwrap();
        let parsed = DevConfigManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.metadata.name, "fleet");
        assert_eq!(parsed.spec.deploy.remote_staging_dir, ".staging");
    }

    #[test]
    fn test_validation() {
        let mut manifest = DevConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.bus.port = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.bus.port = 4000;

        manifest.spec.deploy.remote_staging_dir = " ".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = DevConfigManifest::default();
        manifest.apply_overrides(|key| match key {
            "SUSI_DEV_NODES_FILE" => Some("fleet.txt".to_string()),
            "SUSI_DEV_BUS_PORT" => Some("4242".to_string()),
            _ => None,
        });
        assert_eq!(manifest.spec.workspace.nodes_file, PathBuf::from("fleet.txt"));
        assert_eq!(manifest.spec.bus.port, 4242);

        manifest.apply_overrides(|key| (key == "SUSI_DEV_BUS_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(manifest.spec.bus.port, 4242);
    }

    #[test]
    fn test_archive_url() {
        let pki = PkiConfig::default();
        assert_eq!(
            pki.archive_url(),
            "https://github.com/OpenVPN/easy-rsa/releases/download/3.0.1/EasyRSA-3.0.1.tgz"
        );
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = DevConfigManifest::load_or_default(Some(dir.path().join("absent.yaml")), dir.path());
        assert!(result.is_err());
    }
}
