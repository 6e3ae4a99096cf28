// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server bootstrap
//!
//! Handles:
//! - Configuration loading and validation
//! - Storage backend selection (and migrations for PostgreSQL)
//! - Optional Prometheus exporter
//! - HTTP serving with graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use clearance_core::application::repository_factory::create_clearance_repository;
use clearance_core::application::{ClearanceService, StandardClearanceService};
use clearance_core::domain::repository::StorageBackend;
use clearance_core::domain::service_config::ServiceConfigManifest;
use clearance_core::infrastructure::db::Database;
use clearance_core::infrastructure::event_bus::EventBus;
use clearance_core::presentation::api;
use clearance_mailbox::infrastructure::InMemoryMailboxRepository;
use clearance_mailbox::{MailboxService, StandardMailboxService};

use crate::commands::db::MIGRATOR;

pub mod client;

pub use client::{ClearanceClient, Identity};

/// Clearance routes plus the mailbox, sharing one clearance service.
pub fn build_router(
    clearance_service: Arc<dyn ClearanceService>,
    mailbox_service: Arc<dyn MailboxService>,
    event_bus: Arc<EventBus>,
) -> Router {
    api::app(clearance_service.clone(), event_bus)
        .merge(clearance_mailbox::presentation::router(mailbox_service, clearance_service))
}

pub async fn start_server(config_path: Option<PathBuf>, port_override: Option<u16>) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    info!(
        name = %config.metadata.name,
        backend = ?config.spec.storage.backend,
        cache_capacity = config.spec.cache.capacity,
        "Configuration loaded"
    );

    if let Some(metrics) = config.metrics() {
        let addr: SocketAddr = format!("{}:{}", config.spec.server.bind_address, metrics.port)
            .parse()
            .context("Invalid metrics listen address")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus exporter listening on {}", addr);
    }

    let backend = config.storage_backend()?;
    let database = match &backend {
        StorageBackend::InMemory => None,
        StorageBackend::PostgreSQL(pg) => {
            let database = Database::new(&pg.connection_string).await?;
            MIGRATOR
                .run(database.get_pool())
                .await
                .context("Failed to apply database migrations")?;
            Some(database)
        }
    };

    let repository = create_clearance_repository(&backend, database.as_ref(), config.spec.cache.capacity)?;
    let event_bus = Arc::new(EventBus::new(config.spec.events.capacity));
    let clearance_service: Arc<dyn ClearanceService> =
        Arc::new(StandardClearanceService::new(repository, event_bus.clone()));
    let mailbox_service: Arc<dyn MailboxService> =
        Arc::new(StandardMailboxService::new(Arc::new(InMemoryMailboxRepository::new())));

    let app = build_router(clearance_service, mailbox_service, event_bus);

    let port = port_override.unwrap_or(config.spec.server.port);
    let addr = format!("{}:{}", config.spec.server.bind_address, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Clearance server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Clearance server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
