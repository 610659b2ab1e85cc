// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use async_trait::async_trait;
use common::{templates, workspace, RecordingRunner};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use susi_dev_core::domain::component::ComponentDescriptor;
use susi_dev_core::domain::config::SourceConfig;
use susi_dev_core::domain::container::{ContainerError, ImageBuilder};
use susi_dev_core::domain::shell::Privilege;
use susi_dev_core::domain::source::{SourceBuilder, SourceError, TargetOs};
use susi_dev_core::domain::workspace::{NodeLayout, Workspace};
use susi_dev_core::infrastructure::source::AciSourceBuilder;

/// Hands out builder image paths without building anything
#[derive(Default)]
struct FakeImages {
    builders: Mutex<Vec<(TargetOs, Option<String>)>>,
}

#[async_trait]
impl ImageBuilder for FakeImages {
    async fn build_base_image(&self) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn build_component_image(
        &self,
        node: &NodeLayout,
        _hosts: &str,
        component: &ComponentDescriptor,
        _passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError> {
        Ok(node.image_file(component.name(), "amd64"))
    }

    async fn build_builder_image(
        &self,
        os: TargetOs,
        passphrase: Option<&str>,
    ) -> Result<PathBuf, ContainerError> {
        self.builders
            .lock()
            .unwrap()
            .push((os, passphrase.map(str::to_string)));
        Ok(PathBuf::from(format!("/var/cache/susi-builder-{}.aci", os)))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    workspace: Workspace,
    runner: Arc<RecordingRunner>,
    images: Arc<FakeImages>,
    builder: AciSourceBuilder,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace(dir.path());
    let runner = RecordingRunner::new();
    let images = Arc::new(FakeImages::default());
    let builder = AciSourceBuilder::new(
        workspace.clone(),
        SourceConfig::default(),
        images.clone(),
        runner.clone(),
        templates(),
    );
    Harness {
        _dir: dir,
        workspace,
        runner,
        images,
        builder,
    }
}

fn cloned(h: &Harness) {
    std::fs::create_dir_all(&h.workspace.source_dir).unwrap();
}

#[tokio::test]
async fn test_clone_runs_git_once() {
    let h = harness();
    h.builder.clone_source().await.unwrap();
    let scripts = h.runner.scripts();
    assert_eq!(h.runner.labels(), vec!["git clone"]);
    assert!(scripts[0]
        .body
        .contains("git clone --recursive https://github.com/webvariants/susi.git"));

    cloned(&h);
    h.builder.clone_source().await.unwrap();
    assert_eq!(h.runner.scripts().len(), 1);
}

#[tokio::test]
async fn test_checkout_and_build_need_a_clone() {
    let h = harness();

    let err = h.builder.checkout("develop").await.unwrap_err();
    assert!(matches!(err, SourceError::NotCloned(ref d) if *d == h.workspace.source_dir));

    let err = h.builder.build(TargetOs::Armv7, Some("pw")).await.unwrap_err();
    assert!(matches!(err, SourceError::NotCloned(_)));

    assert!(h.runner.scripts().is_empty());
    assert!(h.images.builders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_branch() {
    let h = harness();
    cloned(&h);
    h.builder.checkout("develop").await.unwrap();
    let scripts = h.runner.scripts();
    assert_eq!(scripts[0].label, "git checkout");
    assert!(scripts[0].body.contains("git checkout develop"));
    assert!(scripts[0].body.contains("git submodule update --init --recursive"));
}

#[tokio::test]
async fn test_native_build_skips_builder_image() {
    let h = harness();
    cloned(&h);
    let package = h.workspace.root.join("susi-native.deb");
    h.runner.produces("native build", package.clone());

    let built = h.builder.build(TargetOs::Native, None).await.unwrap();
    assert_eq!(built, Some(package));

    let scripts = h.runner.scripts();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].label, "native build");
    assert_eq!(scripts[0].privilege, Privilege::User);
    assert!(scripts[0].body.contains("make -j\"$(nproc)\" package"));
    assert!(h.images.builders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_build_uses_builder_image() {
    let h = harness();
    cloned(&h);
    h.runner
        .produces("armv7 build", h.workspace.root.join("susi-armv7.deb"));

    let built = h.builder.build(TargetOs::Armv7, Some("pw")).await.unwrap();
    assert_eq!(built, Some(h.workspace.root.join("susi-armv7.deb")));

    assert_eq!(
        *h.images.builders.lock().unwrap(),
        vec![(TargetOs::Armv7, Some("pw".to_string()))]
    );
    let scripts = h.runner.scripts();
    assert_eq!(scripts[0].label, "armv7 build");
    assert_eq!(scripts[0].privilege, Privilege::Root);
    assert!(scripts[0].body.contains("/var/cache/susi-builder-armv7.aci"));
}

#[tokio::test]
async fn test_missing_package_reported() {
    let h = harness();
    cloned(&h);

    for os in [TargetOs::DebianStable, TargetOs::Armv7] {
        let err = h.builder.build(os, Some("pw")).await.unwrap_err();
        match err {
            SourceError::NoPackage { os: failed, dir } => {
                assert_eq!(failed, os);
                assert_eq!(dir, h.workspace.build_dir.join(os.name()));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_alpine_build_has_no_package() {
    let h = harness();
    cloned(&h);
    let built = h.builder.build(TargetOs::Alpine, None).await.unwrap();
    assert_eq!(built, None);
    assert_eq!(h.runner.labels(), vec!["alpine build"]);
}
