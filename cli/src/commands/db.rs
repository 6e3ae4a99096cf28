// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database migration commands
//!
//! `clearance db migrate` brings the PostgreSQL schema up to date using the
//! SQL files under `cli/migrations`. `--dry-run` lists what would be applied.
//!
//! The connection string comes from the configured storage section, so
//! `CLEARANCE_DATABASE_URL` and `env:` references both work.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashSet;
use std::path::PathBuf;

use clearance_core::domain::repository::StorageBackend;
use clearance_core::domain::service_config::{ServiceConfigManifest, StorageBackendKind};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Subcommand)]
pub enum DbCommand {
    /// Apply pending migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn handle_command(command: DbCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        DbCommand::Migrate { dry_run } => migrate(config_override, dry_run).await,
    }
}

async fn migrate(config_override: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let mut config =
        ServiceConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;
    // Migrations only make sense against PostgreSQL
    config.spec.storage.backend = StorageBackendKind::Postgres;

    let connection_string = match config.storage_backend()? {
        StorageBackend::PostgreSQL(pg) => pg.connection_string,
        StorageBackend::InMemory => anyhow::bail!("No database configured"),
    };

    println!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&connection_string)
        .await
        .context("Failed to connect to database")?;

    // The bookkeeping table does not exist before the first run
    let applied: HashSet<i64> = match sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations")
        .fetch_all(&pool)
        .await
    {
        Ok(versions) => versions.into_iter().collect(),
        Err(_) => HashSet::new(),
    };

    let pending: Vec<_> = MIGRATOR.iter().filter(|m| !applied.contains(&m.version)).collect();
    println!(
        "Migration status: {} applied, {} total available.",
        applied.len(),
        MIGRATOR.iter().count()
    );

    if pending.is_empty() {
        println!("{}", "✓ Database is up to date.".green());
        return Ok(());
    }

    if dry_run {
        println!("Pending migrations:");
        for migration in &pending {
            println!("  - {} {}", migration.version, migration.description);
        }
        println!("{}", "Skipping application due to --dry-run".yellow());
        return Ok(());
    }

    println!("Applying {} pending migration(s)...", pending.len());
    MIGRATOR.run(&pool).await.context("Failed to apply migrations")?;
    println!("{}", "✓ Database updated successfully.".green());
    Ok(())
}
