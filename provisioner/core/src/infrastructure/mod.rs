// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod acbuild;
pub mod easyrsa;
pub mod node_store;
pub mod rkt;
pub mod setup;
pub mod shell;
pub mod source;
pub mod ssh_deploy;
pub mod template_engine;

pub use node_store::{NodeStore, NodeStoreError};
pub use shell::BashRunner;
pub use template_engine::TemplateEngine;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file below `dir` as (full path, path relative to `dir`), sorted.
/// A missing directory yields nothing.
pub(crate) fn files_under(dir: &Path) -> std::io::Result<Vec<(PathBuf, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            let path = entry.path().to_path_buf();
            let relative = path.strip_prefix(dir).unwrap_or(&path).to_path_buf();
            files.push((path, relative));
        }
    }
    Ok(files)
}
