// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Kubernetes-style manifest for a clearance desk deployment:
// - apiVersion/kind/metadata/spec envelope
// - HTTP server bind settings
// - Storage backend selection (in-memory or PostgreSQL)
// - Cache and event bus sizing
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "clearance.university/v1";
pub const KIND: &str = "ClearanceConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "clearance.university/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ClearanceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Deployment name, shown in logs and `clearance status`
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Records kept in the read-through cache; 0 disables it
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast buffer; slow subscribers past this lag lose events
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9091
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_event_capacity() -> usize {
    1000
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "clearance-desk".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CLEARANCE_CONFIG_PATH environment variable
    /// 2. ./clearance-config.yaml (working directory)
    /// 3. ~/.clearance/config.yaml (user home)
    /// 4. /etc/clearance/config.yaml (system, Unix) or C:\ProgramData\Clearance\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CLEARANCE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./clearance-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".clearance").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/clearance/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Clearance\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CLEARANCE_DATABASE_URL") {
            tracing::info!("Environment override: CLEARANCE_DATABASE_URL");
            self.spec.storage.database_url = Some(url);
        }

        if let Ok(val) = std::env::var("CLEARANCE_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "in-memory" | "memory" => {
                    tracing::info!("Environment override: CLEARANCE_STORAGE_BACKEND=in-memory");
                    self.spec.storage.backend = StorageBackendKind::InMemory;
                }
                "postgres" | "postgresql" => {
                    tracing::info!("Environment override: CLEARANCE_STORAGE_BACKEND=postgres");
                    self.spec.storage.backend = StorageBackendKind::Postgres;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for CLEARANCE_STORAGE_BACKEND: '{}'. Expected in-memory/postgres. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("CLEARANCE_CACHE_CAPACITY") {
            match val.parse::<usize>() {
                Ok(capacity) => {
                    tracing::info!("Environment override: CLEARANCE_CACHE_CAPACITY={}", capacity);
                    self.spec.cache.capacity = capacity;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for CLEARANCE_CACHE_CAPACITY: '{}'. Expected a number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Resolve the configured backend, following `env:` indirection.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageBackendKind::InMemory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.database_url is required for the postgres backend"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_value(raw)?,
                }))
            }
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_else(|| LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            })
    }

    /// Metrics settings, if the exporter is enabled
    pub fn metrics(&self) -> Option<&MetricsConfig> {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.metrics.as_ref())
            .filter(|m| m.enabled)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.server.port == 0 {
            anyhow::bail!("spec.server.port cannot be 0");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres {
            match self.spec.storage.database_url.as_deref() {
                None | Some("") => {
                    anyhow::bail!("spec.storage.database_url is required for the postgres backend")
                }
                Some(_) => {}
            }
        }

        if self.spec.events.capacity == 0 {
            anyhow::bail!("spec.events.capacity must be greater than 0");
        }

        let logging = self.logging();
        if logging.format != "json" && logging.format != "text" {
            anyhow::bail!(
                "Invalid logging format: '{}'. Must be 'json' or 'text'",
                logging.format
            );
        }

        if let Some(metrics) = self.metrics() {
            if metrics.port == self.spec.server.port {
                anyhow::bail!("Metrics port {} collides with the API port", metrics.port);
            }
        }

        Ok(())
    }
}

/// Expand an `env:VAR_NAME` reference; other values pass through.
pub fn resolve_env_value(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' is not set", var)),
        None => Ok(value.to_string()),
    }
}
