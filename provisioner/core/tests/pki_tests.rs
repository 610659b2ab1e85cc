// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use common::{templates, RecordingRunner};
use std::path::Path;
use std::sync::Arc;
use susi_dev_core::domain::config::PkiConfig;
use susi_dev_core::domain::pki::{CertificateAuthority, KeyStore, PkiError};
use susi_dev_core::infrastructure::easyrsa::EasyRsa;

fn easyrsa(runner: Arc<RecordingRunner>) -> EasyRsa {
    EasyRsa::new(PkiConfig::default(), runner, templates())
}

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "x").unwrap();
}

fn initialised(dir: &Path) -> KeyStore {
    let store = KeyStore::new(dir);
    touch(&store.ca_certificate());
    store
}

#[tokio::test]
async fn test_init_downloads_and_builds_ca() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let pki = dir.path().join("nodeA").join("pki");

    let store = easyrsa(runner.clone()).init(&pki).await.unwrap();
    assert_eq!(store.dir(), pki.as_path());

    let scripts = runner.scripts();
    assert_eq!(runner.labels(), vec!["easyrsa init"]);
    assert!(scripts[0]
        .body
        .contains("https://github.com/OpenVPN/easy-rsa/releases/download/3.0.1/EasyRSA-3.0.1.tgz"));
    assert!(scripts[0].body.contains("./easyrsa --batch init-pki"));
    assert!(scripts[0].body.contains("./easyrsa --batch build-ca nopass"));
}

#[tokio::test]
async fn test_init_skips_existing_authority() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    initialised(dir.path());

    easyrsa(runner.clone()).init(dir.path()).await.unwrap();
    assert!(runner.scripts().is_empty());
}

#[tokio::test]
async fn test_issue_requires_authority() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();

    let err = easyrsa(runner.clone())
        .issue(dir.path(), "susi-core")
        .await
        .unwrap_err();
    assert!(matches!(err, PkiError::NotInitialized(ref d) if d == dir.path()));
    assert!(runner.scripts().is_empty());
}

#[tokio::test]
async fn test_issue_skips_existing_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let store = initialised(dir.path());
    touch(&store.certificate("susi-core"));
    touch(&store.private_key("susi-core"));

    easyrsa(runner.clone()).issue(dir.path(), "susi-core").await.unwrap();
    assert!(runner.scripts().is_empty());
}

#[tokio::test]
async fn test_issue_builds_client_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let store = initialised(dir.path());
    runner.produces("easyrsa build-client-full susi-core", store.certificate("susi-core"));
    runner.produces("easyrsa build-client-full susi-core", store.private_key("susi-core"));

    easyrsa(runner.clone()).issue(dir.path(), "susi-core").await.unwrap();

    let scripts = runner.scripts();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].label, "easyrsa build-client-full susi-core");
    assert!(scripts[0]
        .body
        .contains("./easyrsa --batch build-client-full susi-core nopass"));
    assert!(store.has_certificate("susi-core"));
}

#[tokio::test]
async fn test_issue_reports_missing_output() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    initialised(dir.path());

    let err = easyrsa(runner.clone())
        .issue(dir.path(), "susi-mqtt")
        .await
        .unwrap_err();
    match err {
        PkiError::MissingCertificate { name, dir: d } => {
            assert_eq!(name, "susi-mqtt");
            assert_eq!(d, dir.path());
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(runner.labels(), vec!["easyrsa build-client-full susi-mqtt"]);
}

#[tokio::test]
async fn test_issue_propagates_script_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    initialised(dir.path());
    runner.fail("easyrsa build-client-full");

    let err = easyrsa(runner.clone())
        .issue(dir.path(), "susi-core")
        .await
        .unwrap_err();
    assert!(matches!(err, PkiError::Shell(_)));
}

#[tokio::test]
async fn test_dh_skips_existing_params() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let store = initialised(dir.path());
    touch(&store.dh_params());

    easyrsa(runner.clone()).generate_dh(dir.path()).await.unwrap();
    assert!(runner.scripts().is_empty());
}

#[tokio::test]
async fn test_dh_generated_once() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let store = initialised(dir.path());
    runner.produces("easyrsa gen-dh", store.dh_params());

    let ca = easyrsa(runner.clone());
    ca.generate_dh(dir.path()).await.unwrap();
    ca.generate_dh(dir.path()).await.unwrap();
    assert_eq!(runner.labels(), vec!["easyrsa gen-dh"]);
    assert!(runner.scripts()[0].body.contains("./easyrsa --batch gen-dh"));
}
