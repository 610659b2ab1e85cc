// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node provisioning commands: create, add, deploy, components

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use susi_dev_core::application::AddOptions;
use susi_dev_core::domain::deploy::DeployTarget;
use susi_dev_core::domain::node::{check_field, NodeId};

use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Node id, also the name of its directory
    #[arg(value_name = "NODE")]
    pub node: NodeId,

    /// Address the node's pod runs on
    #[arg(long, value_parser = parse_ip)]
    pub ip: Option<String>,

    /// Host name written to the hosts file of the node's images
    #[arg(long, value_parser = parse_fqdn)]
    pub fqdn: Option<String>,
}

fn parse_ip(value: &str) -> Result<String, String> {
    check_field("ip", value).map_err(|e| e.to_string())?;
    Ok(value.to_string())
}

fn parse_fqdn(value: &str) -> Result<String, String> {
    check_field("fqdn", value).map_err(|e| e.to_string())?;
    Ok(value.to_string())
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(value_name = "NODE")]
    pub node: NodeId,

    /// Component name, see `susi-dev components`
    #[arg(value_name = "COMPONENT")]
    pub component: String,

    /// Link the component to this node
    #[arg(long, value_name = "NODE")]
    pub connect_to: Option<NodeId>,

    /// Address of the --connect-to node (defaults to its id)
    #[arg(long, value_name = "ADDRESS", requires = "connect_to")]
    pub addr: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[arg(value_name = "NODE")]
    pub node: NodeId,

    /// ssh destination, `host` or `user@host`
    #[arg(value_name = "TARGET")]
    pub target: DeployTarget,
}

pub async fn create(args: CreateArgs, ctx: &AppContext) -> Result<()> {
    let node = ctx
        .provisioning()
        .create_node(&args.node, args.ip.as_deref(), args.fqdn.as_deref())
        .await
        .with_context(|| format!("Failed to create node '{}'", args.node))?;

    println!(
        "{}",
        format!("✓ Node {} created ({} {})", node.id, node.ip, node.fqdn).green()
    );
    Ok(())
}

pub async fn add(args: AddArgs, ctx: &AppContext) -> Result<()> {
    let options = AddOptions {
        connect_to: args.connect_to,
        address: args.addr,
    };
    let report = ctx
        .provisioning()
        .add_component(&args.node, &args.component, options)
        .await
        .with_context(|| format!("Failed to add {} to node '{}'", args.component, args.node))?;

    println!(
        "{}",
        format!("✓ Added {} to {}", args.component, args.node).green()
    );
    println!("  Unit:   {}", report.unit_file.display());
    if let Some(config) = &report.config_file {
        println!("  Config: {}", config.display());
    }
    for key in &report.foreign_keys {
        println!("  Linked: {}", key.display());
    }
    if let Some(dh) = &report.dh_params {
        println!("  DH:     {}", dh.display());
    }
    Ok(())
}

pub async fn deploy(args: DeployArgs, ctx: &AppContext) -> Result<()> {
    let bundle = ctx
        .provisioning()
        .deploy(&args.node, &args.target)
        .await
        .with_context(|| format!("Failed to deploy node '{}' to {}", args.node, args.target))?;

    println!(
        "{}",
        format!("✓ Deployed {} to {}", args.node, args.target).green()
    );
    println!(
        "  {} keys, {} configs, {} assets",
        bundle.keys.len(),
        bundle.configs.len(),
        bundle.assets.len()
    );
    if bundle.units.is_empty() {
        println!("  {}", "No units to restart".dimmed());
    } else {
        println!("  Restarted: {}", bundle.units.join(", "));
    }
    Ok(())
}

pub fn components(ctx: &AppContext) {
    println!("{}", "Components:".bold());
    for descriptor in ctx.registry.all() {
        let config = descriptor
            .config_file_name()
            .unwrap_or_else(|| "-".to_string());
        let peer = if descriptor.component.requires_peer() {
            " (requires --connect-to)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<20} {:<22} {}{}",
            descriptor.name().bold(),
            config,
            descriptor.component.description(),
            peer
        );
    }
}
