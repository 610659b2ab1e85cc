// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;

use crate::context::AppContext;

/// External tools the commands shell out to
const HOST_TOOLS: &[&str] = &["git", "wget", "gpg", "ssh", "scp", "systemctl", "sudo"];

pub async fn run(ctx: &AppContext) -> Result<()> {
    let presence = ctx
        .installer()
        .install_dependencies()
        .await
        .context("Failed to install the container toolchain")?;

    let mark = |present: bool| if present { "✓".green() } else { "✗".red() };
    println!("{}", "Container toolchain:".bold());
    println!("  {} rkt", mark(presence.rkt_present));
    println!("  {} acbuild", mark(presence.acbuild_present));
    println!("  {} docker2aci", mark(presence.docker2aci_present));

    println!("{}", "Host tools:".bold());
    let mut missing = Vec::new();
    for tool in HOST_TOOLS {
        match which::which(tool) {
            Ok(path) => println!("  {} {} ({})", mark(true), tool, path.display()),
            Err(_) => {
                println!("  {} {}", mark(false), tool);
                missing.push(*tool);
            }
        }
    }
    if !missing.is_empty() {
        println!(
            "{}",
            format!("⚠ Install {} with your package manager", missing.join(", ")).yellow()
        );
    }
    Ok(())
}
