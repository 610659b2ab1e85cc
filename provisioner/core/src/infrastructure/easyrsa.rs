// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! easy-rsa certificate authority adapter

use crate::domain::config::PkiConfig;
use crate::domain::pki::{CertificateAuthority, KeyStore, PkiError};
use crate::domain::shell::{Script, ScriptRunner};
use crate::infrastructure::template_engine::TemplateEngine;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub struct EasyRsa {
    config: PkiConfig,
    runner: Arc<dyn ScriptRunner>,
    templates: Arc<TemplateEngine>,
}

impl EasyRsa {
    pub fn new(config: PkiConfig, runner: Arc<dyn ScriptRunner>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            config,
            runner,
            templates,
        }
    }
}

#[async_trait]
impl CertificateAuthority for EasyRsa {
    async fn init(&self, dir: &Path) -> Result<KeyStore, PkiError> {
        let store = KeyStore::new(dir);
        if store.is_initialized() {
            info!(dir = %dir.display(), "Certificate authority already initialised");
            return Ok(store);
        }

        let release = format!("EasyRSA-{}", self.config.easyrsa_version);
        let body = self.templates.render(
            "easyrsa-init",
            &json!({
                "dir": dir,
                "url": self.config.archive_url(),
                "archive": format!("{}.tgz", release),
                "release": release,
            }),
        )?;

        info!(dir = %dir.display(), "Initialising certificate authority");
        self.runner
            .run(Script::new("easyrsa init", body).captured())
            .await
            .map_err(|e| {
                error!(dir = %dir.display(), "Certificate authority initialisation failed: {}", e);
                PkiError::from(e)
            })?;
        Ok(store)
    }

    async fn issue(&self, dir: &Path, name: &str) -> Result<(), PkiError> {
        let store = KeyStore::new(dir);
        if !store.is_initialized() {
            return Err(PkiError::NotInitialized(dir.to_path_buf()));
        }
        if store.has_certificate(name) {
            info!(dir = %dir.display(), name, "Certificate already issued");
            return Ok(());
        }

        let body = self
            .templates
            .render("easyrsa-issue", &json!({ "dir": dir, "name": name }))?;

        info!(dir = %dir.display(), name, "Issuing certificate");
        self.runner
            .run(Script::new(format!("easyrsa build-client-full {}", name), body).captured())
            .await
            .map_err(|e| {
                error!(dir = %dir.display(), name, "Certificate issue failed: {}", e);
                PkiError::from(e)
            })?;

        if !store.has_certificate(name) {
            error!(dir = %dir.display(), name, "easy-rsa exited cleanly but wrote no certificate");
            return Err(PkiError::MissingCertificate {
                name: name.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        Ok(())
    }

    async fn generate_dh(&self, dir: &Path) -> Result<(), PkiError> {
        let store = KeyStore::new(dir);
        if !store.is_initialized() {
            return Err(PkiError::NotInitialized(dir.to_path_buf()));
        }
        if store.dh_params().is_file() {
            return Ok(());
        }

        let body = self.templates.render("easyrsa-dh", &json!({ "dir": dir }))?;

        info!(dir = %dir.display(), "Generating Diffie-Hellman parameters, this takes a while");
        self.runner
            .run(Script::new("easyrsa gen-dh", body).captured())
            .await?;
        Ok(())
    }
}
