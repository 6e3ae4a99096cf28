// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Clearance Desk CLI
//!
//! The `clearance` binary runs the clearance server and talks to it.
//!
//! ## Commands
//!
//! - `clearance serve` - Run the HTTP server
//! - `clearance status` - Check whether a server is answering
//! - `clearance config show|validate|generate` - Configuration management
//! - `clearance db migrate [--dry-run]` - PostgreSQL schema migrations
//! - `clearance record create|show|list|set|reopen` - Clearance records
//! - `clearance message send|list` - Clearance threads
//! - `clearance mailbox inbox|send|broadcast|reply|read` - Mailbox
//!
//! Client commands act as the identity given by `--actor-id`,
//! `--actor-role` and `--actor-department`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use clearance_core::domain::service_config::ServiceConfigManifest;
use clearance_desk::commands::{self, ConfigCommand, DbCommand, MailboxCommand, MessageCommand, RecordCommand};
use clearance_desk::server::{self, ClearanceClient, Identity};

/// University clearance desk
#[derive(Parser)]
#[command(name = "clearance")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "CLEARANCE_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server port for client commands
    #[arg(long, global = true, env = "CLEARANCE_PORT", default_value = "8080")]
    port: u16,

    /// Server host for client commands
    #[arg(long, global = true, env = "CLEARANCE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "CLEARANCE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text or json); defaults to the configured format
    #[arg(long, global = true, env = "CLEARANCE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Caller id sent to the server
    #[arg(long, global = true, env = "CLEARANCE_ACTOR_ID")]
    actor_id: Option<String>,

    /// Caller role: student, department or admin
    #[arg(long, global = true, env = "CLEARANCE_ACTOR_ROLE", default_value = "admin")]
    actor_role: String,

    /// Department key, for the department role
    #[arg(long, global = true, env = "CLEARANCE_ACTOR_DEPARTMENT")]
    actor_department: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the clearance HTTP server
    Serve {
        /// Listen port (overrides spec.server.port)
        #[arg(long = "listen-port")]
        listen_port: Option<u16>,
    },

    /// Check whether a server is running
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Clearance records
    Record {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Clearance thread messages
    Message {
        #[command(subcommand)]
        command: MessageCommand,
    },

    /// Mailbox
    Mailbox {
        #[command(subcommand)]
        command: MailboxCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // The server takes its log settings from config unless overridden
    let configured = match cli.command {
        Some(Commands::Serve { .. }) => ServiceConfigManifest::load_or_default(cli.config.clone())
            .ok()
            .map(|c| c.logging()),
        _ => None,
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.format.clone()))
        .unwrap_or_else(|| "text".to_string());
    init_logging(&level, &format)?;

    let identity = cli.actor_id.clone().map(|id| Identity {
        id,
        role: cli.actor_role.clone(),
        department: cli.actor_department.clone(),
    });

    match cli.command {
        Some(Commands::Serve { listen_port }) => {
            info!("Starting clearance server");
            server::start_server(cli.config, listen_port).await
        }
        Some(Commands::Status) => {
            let client = ClearanceClient::new(&cli.host, cli.port, identity)?;
            commands::status::execute(&client).await
        }
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Db { command }) => commands::db::handle_command(command, cli.config).await,
        Some(Commands::Record { command }) => {
            let client = ClearanceClient::new(&cli.host, cli.port, identity)?;
            commands::record::handle_command(command, &client).await
        }
        Some(Commands::Message { command }) => {
            let client = ClearanceClient::new(&cli.host, cli.port, identity)?;
            commands::message::handle_command(command, &client).await
        }
        Some(Commands::Mailbox { command }) => {
            let client = ClearanceClient::new(&cli.host, cli.port, identity)?;
            commands::mailbox::handle_command(command, &client).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
