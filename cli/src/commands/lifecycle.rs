// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node pod lifecycle: start, stop, status, logs, enter, list

use anyhow::{Context, Result};
use colored::Colorize;

use susi_dev_core::domain::node::NodeId;

use crate::context::AppContext;

pub async fn start(node: &NodeId, ctx: &AppContext) -> Result<()> {
    let node = ctx
        .lifecycle()
        .start(node)
        .await
        .with_context(|| format!("Failed to start node '{}'", node))?;

    println!("{}", format!("✓ Node {} started", node.id).green());
    if let Some(unit) = &node.unit_id {
        println!("  Unit: {}", unit);
    }
    if let Some(instance) = &node.instance_id {
        println!("  Pod:  {}", instance);
    }
    Ok(())
}

pub async fn stop(node: &NodeId, ctx: &AppContext) -> Result<()> {
    ctx.lifecycle()
        .stop(node)
        .await
        .with_context(|| format!("Failed to stop node '{}'", node))?;
    println!("{}", format!("✓ Node {} stopped", node).green());
    Ok(())
}

pub async fn status(node: &NodeId, ctx: &AppContext) -> Result<()> {
    let status = ctx
        .lifecycle()
        .status(node)
        .await
        .with_context(|| format!("Failed to query node '{}'", node))?;
    print!("{}", status);
    Ok(())
}

pub async fn logs(node: &NodeId, follow: bool, ctx: &AppContext) -> Result<()> {
    ctx.lifecycle()
        .logs(node, follow)
        .await
        .with_context(|| format!("Failed to show logs of '{}'", node))
}

pub async fn enter(node: &NodeId, ctx: &AppContext) -> Result<()> {
    ctx.lifecycle()
        .enter(node)
        .await
        .with_context(|| format!("Failed to enter node '{}'", node))
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let service = ctx.lifecycle();
    let nodes = service.list();

    if nodes.is_empty() {
        println!("{}", "No nodes. Create one with `susi-dev create <node>`.".yellow());
        return Ok(());
    }

    println!(
        "{:<16} {:<16} {:<24} {}",
        "NODE".bold(),
        "IP".bold(),
        "FQDN".bold(),
        "STATE".bold()
    );
    for node in &nodes {
        let state = match &node.unit_id {
            Some(unit) => format!("running ({})", unit).green(),
            None => "stopped".dimmed(),
        };
        println!("{:<16} {:<16} {:<24} {}", node.id.as_str(), node.ip, node.fqdn, state);
    }

    let pods = service.pods().await;
    if !pods.trim().is_empty() {
        println!();
        println!("{}", "Pods:".bold());
        print!("{}", pods);
    }
    Ok(())
}
