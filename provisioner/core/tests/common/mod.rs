// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use susi_dev_core::domain::component::{BusEndpoint, ComponentRegistry};
use susi_dev_core::domain::pki::{CertificateAuthority, KeyStore, PkiError};
use susi_dev_core::domain::shell::{Script, ScriptOutput, ScriptRunner, ShellError};
use susi_dev_core::domain::workspace::Workspace;
use susi_dev_core::infrastructure::TemplateEngine;

/// Records every script and answers with canned output keyed by label
#[derive(Default)]
pub struct RecordingRunner {
    scripts: Mutex<Vec<Script>>,
    outputs: Mutex<HashMap<String, ScriptOutput>>,
    failing: Mutex<Vec<String>>,
    produced: Mutex<HashMap<String, Vec<PathBuf>>>,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, label: &str, stdout: &str, stderr: &str) {
        self.outputs.lock().unwrap().insert(
            label.to_string(),
            ScriptOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Fail every script whose label starts with `prefix`
    pub fn fail(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    /// Write `path` whenever a script labelled `label` succeeds
    pub fn produces(&self, label: &str, path: PathBuf) {
        self.produced
            .lock()
            .unwrap()
            .entry(label.to_string())
            .or_default()
            .push(path);
    }

    pub fn scripts(&self) -> Vec<Script> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.scripts().into_iter().map(|s| s.label).collect()
    }
}

#[async_trait]
impl ScriptRunner for RecordingRunner {
    async fn run(&self, script: Script) -> Result<ScriptOutput, ShellError> {
        let label = script.label.clone();
        self.scripts.lock().unwrap().push(script);

        if self.failing.lock().unwrap().iter().any(|p| label.starts_with(p)) {
            return Err(ShellError::Failed {
                label,
                code: Some(255),
                stderr: "ssh: connect to host unreachable port 22: No route to host".to_string(),
            });
        }
        if let Some(paths) = self.produced.lock().unwrap().get(&label) {
            for path in paths {
                touch(path, &label);
            }
        }
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(&label)
            .cloned()
            .unwrap_or_default())
    }
}

/// Writes the files easy-rsa would produce, without running anything
#[derive(Default)]
pub struct FakeAuthority {
    pub issued: Mutex<Vec<(PathBuf, String)>>,
}

fn touch(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[async_trait]
impl CertificateAuthority for FakeAuthority {
    async fn init(&self, dir: &Path) -> Result<KeyStore, PkiError> {
        let store = KeyStore::new(dir);
        touch(&store.ca_certificate(), "ca");
        touch(&store.private_key("ca"), "ca key");
        Ok(store)
    }

    async fn issue(&self, dir: &Path, name: &str) -> Result<(), PkiError> {
        let store = KeyStore::new(dir);
        if !store.is_initialized() {
            return Err(PkiError::NotInitialized(dir.to_path_buf()));
        }
        touch(&store.certificate(name), name);
        touch(&store.private_key(name), name);
        self.issued
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), name.to_string()));
        Ok(())
    }

    async fn generate_dh(&self, dir: &Path) -> Result<(), PkiError> {
        touch(&KeyStore::new(dir).dh_params(), "dh");
        Ok(())
    }
}

pub fn workspace(root: &Path) -> Workspace {
    Workspace::new(root, "nodes.txt", ".containers", ".build", ".susi-src")
}

pub fn registry() -> Arc<ComponentRegistry> {
    Arc::new(ComponentRegistry::new(BusEndpoint::default()))
}

pub fn templates() -> Arc<TemplateEngine> {
    Arc::new(TemplateEngine::new().unwrap())
}

/// Every regular file below `root`, relative and sorted
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                std::fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}
