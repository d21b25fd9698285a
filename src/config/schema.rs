//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the config-distribution service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Durable store settings.
    pub storage: StorageConfig,

    /// Key-value store the merged documents are published to.
    pub kv: KvConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file. Without it the store lives in memory only.
    pub snapshot_path: Option<String>,
}

/// Which key-value client publish uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    /// etcd v3 JSON gateway.
    #[default]
    Etcd,
    /// Process-local map, for development.
    Memory,
}

/// Key-value store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KvConfig {
    pub backend: KvBackend,

    /// Prefix of every published key (e.g., "/confgate").
    pub key_prefix: String,

    /// Connection establishment timeout in seconds.
    pub dial_timeout_secs: u64,

    /// Per-put timeout in seconds.
    pub request_timeout_secs: u64,

    /// Endpoints used when a namespace has no environment, or its
    /// environment has no entry in `environments`.
    pub default_endpoints: Vec<String>,

    /// Endpoints per environment name.
    pub environments: BTreeMap<String, Vec<String>>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            backend: KvBackend::Etcd,
            key_prefix: "/confgate".to_string(),
            dial_timeout_secs: 5,
            request_timeout_secs: 5,
            default_endpoints: vec!["http://127.0.0.1:2379".to_string()],
            environments: BTreeMap::new(),
        }
    }
}

impl KvConfig {
    /// Endpoints a namespace with the given environment publishes to.
    pub fn endpoints_for(&self, environment: Option<&str>) -> &[String] {
        environment
            .and_then(|env| self.environments.get(env))
            .unwrap_or(&self.default_endpoints)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
