// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use susi_dev_core::domain::config::{DevConfigManifest, WORKSPACE_CONFIG_FILE};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./susi-dev.yaml)
        #[arg(short, long, default_value = WORKSPACE_CONFIG_FILE)]
        output: PathBuf,

        /// Include comments and example labels
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
    workspace_root: &Path,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, workspace_root, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override), workspace_root),
        ConfigCommand::Generate { output, examples } => {
            generate(&workspace_root.join(output), examples)
        }
    }
}

fn show(config_override: Option<PathBuf>, workspace_root: &Path, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. SUSI_DEV_CONFIG: {}",
            std::env::var("SUSI_DEV_CONFIG")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. {}", workspace_root.join(WORKSPACE_CONFIG_FILE).display());
        println!("  4. ~/.susi-dev/config.yaml");
        println!("  5. /etc/susi-dev/config.yaml");
        println!();
    }

    let config = DevConfigManifest::load_or_default(config_override, workspace_root)
        .context("Failed to load configuration")?;
    let yaml = config.to_yaml().context("Failed to render configuration")?;

    println!("{}", "Current configuration:".bold());
    println!();
    print!("{}", yaml);
    Ok(())
}

fn validate(config_path: Option<PathBuf>, workspace_root: &Path) -> Result<()> {
    println!("Validating configuration...");

    let config = DevConfigManifest::load_or_default(config_path, workspace_root)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/susi-dev.yaml").to_string()
    } else {
        DevConfigManifest::default()
            .to_yaml()
            .context("Failed to render default configuration")?
    };

    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_is_valid() {
        let config =
            DevConfigManifest::from_yaml_str(include_str!("../../templates/susi-dev.yaml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.bus.port, 4000);
        assert_eq!(config.spec.deploy.remote_staging_dir, ".susi-dev-temp");
    }

    #[test]
    fn test_generate_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("susi-dev.yaml");
        generate(&output, false).unwrap();

        let config = DevConfigManifest::from_yaml_file(&output).unwrap();
        config.validate().unwrap();
    }
}
