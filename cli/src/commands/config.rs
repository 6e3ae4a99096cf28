// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use clearance_core::domain::service_config::{ServiceConfigManifest, StorageBackendKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./clearance-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(&output, examples, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. CLEARANCE_CONFIG_PATH: {}",
            std::env::var("CLEARANCE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./clearance-config.yaml");
        println!("  4. ~/.clearance/config.yaml");
        println!("  5. /etc/clearance/config.yaml");
        println!();
    }

    let config = ServiceConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;

    if as_yaml {
        print!(
            "{}",
            serde_yaml::to_string(&config).context("Failed to render configuration")?
        );
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Service:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", config.spec.server.bind_address, config.spec.server.port);
    println!();

    println!("{}", "Storage:".bold());
    match config.spec.storage.backend {
        StorageBackendKind::InMemory => println!("  Backend: in-memory"),
        StorageBackendKind::Postgres => {
            println!("  Backend: postgres");
            // Only env references are safe to echo; literal URLs may carry passwords
            let url = config.spec.storage.database_url.as_deref().unwrap_or("(none)");
            if url.starts_with("env:") {
                println!("  Database URL: {}", url);
            } else {
                println!("  Database URL: {}", "(set)".dimmed());
            }
        }
    }
    println!("  Cache capacity: {}", config.spec.cache.capacity);
    println!("  Event buffer: {}", config.spec.events.capacity);
    println!();

    let logging = config.logging();
    println!("{}", "Observability:".bold());
    println!("  Logging: {} ({})", logging.level, logging.format);
    match config.metrics() {
        Some(metrics) => println!("  Metrics: enabled on port {}", metrics.port),
        None => println!("  Metrics: {}", "disabled".dimmed()),
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    // Surface unresolved env: references now rather than at startup
    config.storage_backend()?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

pub fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    std::fs::write(output, sample_config(with_examples))
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
    fn test_templates_parse_and_validate() {
        let minimal = ServiceConfigManifest::from_yaml_str(sample_config(false)).unwrap();
        minimal.validate().unwrap();
        assert_eq!(minimal.spec.storage.backend, StorageBackendKind::InMemory);

        let full = ServiceConfigManifest::from_yaml_str(sample_config(true)).unwrap();
        full.validate().unwrap();
        assert_eq!(full.spec.storage.backend, StorageBackendKind::Postgres);
        assert_eq!(full.logging().format, "json");
        assert_eq!(full.metrics().map(|m| m.port), Some(9091));
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clearance-config.yaml");

        generate(&path, false, false).unwrap();
        assert!(generate(&path, true, false).is_err());
        generate(&path, true, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("observability"));
    }
}
