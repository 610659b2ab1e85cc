// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # susi-dev
//!
//! Provisions susi nodes in a local workspace and ships them to hosts.
//!
//! ## Commands
//!
//! - `susi-dev create|add|deploy` - Node provisioning
//! - `susi-dev pki create|add` - Raw certificate authority access
//! - `susi-dev source clone|checkout|build` - Source builds per target OS
//! - `susi-dev container build|run` - Component images
//! - `susi-dev start|stop|status|logs|enter|list` - Node pod lifecycle
//! - `susi-dev config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use susi_dev::commands::{
    self, AddArgs, ConfigCommand, ContainerCommand, CreateArgs, DeployArgs, PkiCommand,
    SourceCommand,
};
use susi_dev::context::AppContext;
use susi_dev_core::domain::node::NodeId;

/// susi-dev - provision, containerize and deploy susi nodes
#[derive(Parser, Debug)]
#[command(name = "susi-dev")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace directory holding nodes.txt and the node directories
    #[arg(
        short = 'C',
        long,
        global = true,
        env = "SUSI_DEV_WORKSPACE",
        default_value = ".",
        value_name = "DIR"
    )]
    workspace: PathBuf,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SUSI_DEV_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a node with its own certificate authority
    Create(CreateArgs),

    /// Add a component to a node
    Add(AddArgs),

    /// Copy a node's keys, configs and assets to a host and restart its units
    Deploy(DeployArgs),

    /// List the available components
    Components,

    /// Certificate authority operations
    #[command(name = "pki")]
    Pki {
        #[command(subcommand)]
        command: PkiCommand,
    },

    /// Clone and build the susi sources
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },

    /// Build and run component images
    Container {
        #[command(subcommand)]
        command: ContainerCommand,
    },

    /// Start a node's pod under systemd
    Start { node: NodeId },

    /// Stop a running node
    Stop { node: NodeId },

    /// Show the systemd status of a running node
    Status { node: NodeId },

    /// Show the journal of a running node
    Logs {
        node: NodeId,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },

    /// Open a shell in a running node's pod
    Enter { node: NodeId },

    /// List nodes and pods
    List,

    /// Install rkt, acbuild and docker2aci
    Setup,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { command } = cli.command {
        return commands::config::handle_command(command, cli.config, &cli.workspace).await;
    }

    let ctx = AppContext::load(cli.config, &cli.workspace)?;
    debug!(workspace = %ctx.workspace.root.display(), "Workspace loaded");

    match cli.command {
        Commands::Create(args) => commands::node::create(args, &ctx).await,
        Commands::Add(args) => commands::node::add(args, &ctx).await,
        Commands::Deploy(args) => commands::node::deploy(args, &ctx).await,
        Commands::Components => {
            commands::node::components(&ctx);
            Ok(())
        }
        Commands::Pki { command } => commands::pki::handle_command(command, &ctx).await,
        Commands::Source { command } => commands::source::handle_command(command, &ctx).await,
        Commands::Container { command } => {
            commands::container::handle_command(command, &ctx).await
        }
        Commands::Start { node } => commands::lifecycle::start(&node, &ctx).await,
        Commands::Stop { node } => commands::lifecycle::stop(&node, &ctx).await,
        Commands::Status { node } => commands::lifecycle::status(&node, &ctx).await,
        Commands::Logs { node, follow } => commands::lifecycle::logs(&node, follow, &ctx).await,
        Commands::Enter { node } => commands::lifecycle::enter(&node, &ctx).await,
        Commands::List => commands::lifecycle::list(&ctx).await,
        Commands::Setup => commands::setup::run(&ctx).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use susi_dev_core::domain::source::TargetOs;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("susi-dev").chain(args.iter().copied()))
    }

    #[test]
    fn test_add_with_peer() {
        let cli = parse(&["add", "nodeA", "susi-cluster", "--connect-to", "nodeB", "--addr", "10.0.0.5"]).unwrap();
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.node.as_str(), "nodeA");
                assert_eq!(args.component, "susi-cluster");
                assert_eq!(args.connect_to.unwrap().as_str(), "nodeB");
                assert_eq!(args.addr.as_deref(), Some("10.0.0.5"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_addr_requires_connect_to() {
        assert!(parse(&["add", "nodeA", "susi-cluster", "--addr", "10.0.0.5"]).is_err());
    }

    #[test]
    fn test_missing_arguments_are_reported() {
        let err = parse(&["add", "nodeA"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(parse(&["deploy", "nodeA"]).is_err());
        assert!(parse(&["pki", "add", "nodeA/pki"]).is_err());
    }

    #[test]
    fn test_invalid_node_id_rejected() {
        assert!(parse(&["create", "../etc"]).is_err());
    }

    #[test]
    fn test_create_fields_validated() {
        let cli = parse(&["create", "nodeA", "--ip", "10.0.0.1", "--fqdn", "a.lab"]).unwrap();
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.ip.as_deref(), Some("10.0.0.1"));
                assert_eq!(args.fqdn.as_deref(), Some("a.lab"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(parse(&["create", "nodeA", "--fqdn", "a.lab extra"]).is_err());
        assert!(parse(&["create", "nodeB", "--ip", ""]).is_err());
    }

    #[test]
    fn test_source_build_os() {
        let cli = parse(&["source", "build", "--os", "armv7", "--gpgpass", "pw"]).unwrap();
        match cli.command {
            Commands::Source {
                command: SourceCommand::Build { os, gpgpass },
            } => {
                assert_eq!(os, TargetOs::Armv7);
                assert_eq!(gpgpass.as_deref(), Some("pw"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(parse(&["source", "build", "--os", "windows"]).is_err());
    }

    #[test]
    fn test_every_os_value_accepted() {
        for os in ["alpine", "debian-stable", "debian-testing", "native", "armv6", "armv7"] {
            assert!(parse(&["source", "build", "--os", os]).is_ok(), "{}", os);
        }
    }

    #[test]
    fn test_global_workspace_flag() {
        let cli = parse(&["list", "-C", "/srv/fleet"]).unwrap();
        assert_eq!(cli.workspace, PathBuf::from("/srv/fleet"));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_container_build_components() {
        let cli = parse(&[
            "container", "build", "nodeA", "--component", "susi-core", "--component", "susi-mqtt",
        ])
        .unwrap();
        match cli.command {
            Commands::Container {
                command: ContainerCommand::Build { components, .. },
            } => assert_eq!(components, vec!["susi-core", "susi-mqtt"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_deploy_target_validated() {
        assert!(parse(&["deploy", "nodeA", "pi@10.0.0.7"]).is_ok());
        assert!(parse(&["deploy", "nodeA", "-oProxyCommand=x"]).is_err());
    }
}
