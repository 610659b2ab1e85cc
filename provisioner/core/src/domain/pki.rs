// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Per-node certificate authority

use crate::domain::shell::ShellError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PkiError {
    #[error("No certificate authority in {0}; run `susi-dev pki create` first")]
    NotInitialized(PathBuf),

    #[error("Certificate for '{name}' was not produced in {dir}")]
    MissingCertificate { name: String, dir: PathBuf },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Locations inside an easy-rsa authority rooted at `dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pki(&self) -> PathBuf {
        self.dir.join("pki")
    }

    pub fn issued_dir(&self) -> PathBuf {
        self.pki().join("issued")
    }

    pub fn private_dir(&self) -> PathBuf {
        self.pki().join("private")
    }

    pub fn certificate(&self, name: &str) -> PathBuf {
        self.issued_dir().join(format!("{}.crt", name))
    }

    pub fn private_key(&self, name: &str) -> PathBuf {
        self.private_dir().join(format!("{}.key", name))
    }

    pub fn ca_certificate(&self) -> PathBuf {
        self.pki().join("ca.crt")
    }

    pub fn dh_params(&self) -> PathBuf {
        self.pki().join("dh.pem")
    }

    pub fn is_initialized(&self) -> bool {
        self.ca_certificate().is_file()
    }

    pub fn has_certificate(&self, name: &str) -> bool {
        self.certificate(name).is_file() && self.private_key(name).is_file()
    }
}

#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Create the authority in `dir`. An existing authority is left untouched.
    async fn init(&self, dir: &Path) -> Result<KeyStore, PkiError>;

    /// Issue a client certificate and key for `name`, signed by the authority in `dir`
    async fn issue(&self, dir: &Path, name: &str) -> Result<(), PkiError>;

    /// Generate Diffie-Hellman parameters for a VPN server
    async fn generate_dh(&self, dir: &Path) -> Result<(), PkiError>;
}
