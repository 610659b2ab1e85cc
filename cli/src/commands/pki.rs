// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum PkiCommand {
    /// Initialise a certificate authority in DIR
    Create {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Issue a certificate and key for NAME from the authority in DIR
    Add {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(value_name = "NAME")]
        name: String,
    },
}

pub async fn handle_command(command: PkiCommand, ctx: &AppContext) -> Result<()> {
    let service = ctx.provisioning();
    match command {
        PkiCommand::Create { dir } => {
            let dir = ctx.workspace.root.join(dir);
            let store = service
                .pki_init(&dir)
                .await
                .with_context(|| format!("Failed to initialise PKI in {:?}", dir))?;
            println!(
                "{}",
                format!("✓ Certificate authority ready: {}", store.ca_certificate().display()).green()
            );
        }
        PkiCommand::Add { dir, name } => {
            let dir = ctx.workspace.root.join(dir);
            service
                .pki_issue(&dir, &name)
                .await
                .with_context(|| format!("Failed to issue certificate '{}'", name))?;
            println!("{}", format!("✓ Issued certificate for {}", name).green());
        }
    }
    Ok(())
}
