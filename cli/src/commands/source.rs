// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Source checkout and cross builds
//!
//! Commands: clone, checkout, build

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use susi_dev_core::domain::source::{SourceBuilder, TargetOs};

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// Clone the susi sources into the workspace
    Clone,

    /// Check out a branch of the cloned sources
    Checkout {
        /// Branch name (default: spec.source.default_branch)
        #[arg(value_name = "BRANCH")]
        branch: Option<String>,
    },

    /// Build the sources for a target OS
    Build {
        /// alpine, debian-stable, debian-testing, native, armv6 or armv7
        #[arg(long, default_value = "alpine", value_parser = parse_os)]
        os: TargetOs,

        /// Passphrase for signing a new builder image
        #[arg(long, env = "SUSI_DEV_GPGPASS", hide_env_values = true)]
        gpgpass: Option<String>,
    },
}

pub(crate) fn parse_os(value: &str) -> Result<TargetOs, String> {
    value.parse().map_err(|_| {
        let names: Vec<&str> = TargetOs::ALL.iter().map(|os| os.name()).collect();
        format!("expected one of: {}", names.join(", "))
    })
}

pub async fn handle_command(command: SourceCommand, ctx: &AppContext) -> Result<()> {
    let builder = ctx.source_builder();
    match command {
        SourceCommand::Clone => {
            builder.clone_source().await.context("Failed to clone sources")?;
            println!(
                "{}",
                format!("✓ Sources in {}", ctx.workspace.source_dir.display()).green()
            );
        }
        SourceCommand::Checkout { branch } => {
            let branch = branch.unwrap_or_else(|| ctx.config.spec.source.default_branch.clone());
            builder
                .checkout(&branch)
                .await
                .with_context(|| format!("Failed to check out '{}'", branch))?;
            println!("{}", format!("✓ Checked out {}", branch).green());
        }
        SourceCommand::Build { os, gpgpass } => {
            let package = builder
                .build(os, gpgpass.as_deref())
                .await
                .with_context(|| format!("Build for {} failed", os))?;
            match package {
                Some(package) => println!(
                    "{}",
                    format!("✓ Built {}: {}", os, package.display()).green()
                ),
                None => println!("{}", format!("✓ Built {}", os).green()),
            }
        }
    }
    Ok(())
}
