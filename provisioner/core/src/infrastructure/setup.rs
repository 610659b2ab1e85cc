// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host toolchain installation (rkt, acbuild, docker2aci)

use crate::domain::shell::{Script, ScriptRunner, ShellError};
use crate::infrastructure::template_engine::TemplateEngine;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const RKT_VERSION: &str = "1.3.0";
pub const ACBUILD_VERSION: &str = "0.2.2";

/// Install location of the tool symlinks
const BIN_DIR: &str = "/usr/local/bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolPresence {
    pub rkt_present: bool,
    pub acbuild_present: bool,
    pub docker2aci_present: bool,
}

impl ToolPresence {
    pub fn probe(bin_dir: &Path) -> Self {
        Self {
            rkt_present: bin_dir.join("rkt").exists(),
            acbuild_present: bin_dir.join("acbuild").exists(),
            docker2aci_present: bin_dir.join("docker2aci").exists(),
        }
    }

    pub fn all_present(&self) -> bool {
        self.rkt_present && self.acbuild_present && self.docker2aci_present
    }
}

#[derive(Serialize)]
struct SetupContext {
    #[serde(flatten)]
    presence: ToolPresence,
    rkt_version: &'static str,
    acbuild_version: &'static str,
}

pub struct ToolchainInstaller {
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl ToolchainInstaller {
    pub fn new(runner: Arc<dyn ScriptRunner>, templates: Arc<TemplateEngine>) -> Self {
        Self { runner, templates }
    }

    pub fn presence(&self) -> ToolPresence {
        ToolPresence::probe(Path::new(BIN_DIR))
    }

    /// Install the missing tools under /opt, symlinked into /usr/local/bin
    pub async fn install_dependencies(&self) -> Result<ToolPresence, ShellError> {
        let presence = self.presence();
        if presence.all_present() {
            info!("rkt, acbuild and docker2aci already installed");
            return Ok(presence);
        }
        self.install(presence).await?;
        Ok(self.presence())
    }

    async fn install(&self, presence: ToolPresence) -> Result<(), ShellError> {
        let body = self.templates.render(
            "setup",
            &SetupContext {
                presence,
                rkt_version: RKT_VERSION,
                acbuild_version: ACBUILD_VERSION,
            },
        )?;
        info!(?presence, "Installing container toolchain");
        self.runner
            .run(Script::new("install toolchain", body).as_root())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_script_skips_present_tools() {
        let engine = TemplateEngine::new().unwrap();
        let script = engine
            .render(
                "setup",
                &SetupContext {
                    presence: ToolPresence {
                        rkt_present: true,
                        acbuild_present: false,
                        docker2aci_present: true,
                    },
                    rkt_version: RKT_VERSION,
                    acbuild_version: ACBUILD_VERSION,
                },
            )
            .unwrap();
        assert!(!script.contains("rkt-v1.3.0"));
        assert!(!script.contains("docker2aci"));
        assert!(script.contains("acbuild/releases/download/v0.2.2/acbuild.tar.gz"));
        assert!(script.contains("ln -sf /opt/acbuild /usr/local/bin/acbuild"));
    }

    #[test]
    fn test_probe_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let presence = ToolPresence::probe(dir.path());
        assert!(!presence.all_present());
        std::fs::write(dir.path().join("rkt"), "").unwrap();
        assert!(ToolPresence::probe(dir.path()).rkt_present);
    }
}
