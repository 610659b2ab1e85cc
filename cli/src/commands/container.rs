// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use susi_dev_core::domain::node::NodeId;

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// Build the images of a node's components
    Build {
        #[arg(value_name = "NODE")]
        node: NodeId,

        /// Only build these components (default: every installed component)
        #[arg(long = "component", value_name = "COMPONENT")]
        components: Vec<String>,

        /// Passphrase for signing images that do not exist yet
        #[arg(long, env = "SUSI_DEV_GPGPASS", hide_env_values = true)]
        gpgpass: Option<String>,
    },

    /// Run a node's images in the foreground
    Run {
        #[arg(value_name = "NODE")]
        node: NodeId,
    },
}

pub async fn handle_command(command: ContainerCommand, ctx: &AppContext) -> Result<()> {
    let service = ctx.images();
    match command {
        ContainerCommand::Build {
            node,
            components,
            gpgpass,
        } => {
            let images = service
                .build(&node, &components, gpgpass.as_deref())
                .await
                .with_context(|| format!("Failed to build images for '{}'", node))?;
            println!("{}", format!("✓ Built {} image(s) for {}", images.len(), node).green());
            for image in images {
                println!("  {}", image.display());
            }
        }
        ContainerCommand::Run { node } => {
            service
                .run(&node)
                .await
                .with_context(|| format!("Failed to run images of '{}'", node))?;
        }
    }
    Ok(())
}
