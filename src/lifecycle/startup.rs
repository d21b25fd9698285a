//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the durable store (restoring its snapshot)
//! - Build the KV client for the configured backend
//! - Assemble the `ConfigService`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Store and KV backend are chosen once; a config reload only changes
//!   KV settings read per publish (prefix, endpoints, timeouts)

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::schema::StorageConfig;
use crate::config::{AppConfig, KvBackend, KvConfig};
use crate::kv::{EtcdGateway, KvError, KvStore, MemoryKv};
use crate::service::ConfigService;
use crate::storage::{MemoryStore, StorageError, Store};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open store: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to build KV client: {0}")]
    Kv(#[from] KvError),
}

pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>, StartupError> {
    let store = match &config.snapshot_path {
        Some(path) => {
            tracing::info!(path = %path, "Opening store with snapshot");
            MemoryStore::open(path)?
        }
        None => {
            tracing::warn!("No snapshot path configured, state will not survive restarts");
            MemoryStore::new()
        }
    };
    Ok(Arc::new(store))
}

pub fn build_kv(config: &KvConfig) -> Result<Arc<dyn KvStore>, StartupError> {
    let kv: Arc<dyn KvStore> = match config.backend {
        KvBackend::Etcd => Arc::new(EtcdGateway::new(config.dial_timeout())?),
        KvBackend::Memory => Arc::new(MemoryKv::new()),
    };
    tracing::info!(
        backend = kv.backend(),
        key_prefix = %config.key_prefix,
        environments = config.environments.len(),
        "KV client ready"
    );
    Ok(kv)
}

/// Build the service from the live configuration handle.
pub fn build_service(config: Arc<ArcSwap<AppConfig>>) -> Result<ConfigService, StartupError> {
    let current = config.load_full();
    let store = open_store(&current.storage)?;
    let kv = build_kv(&current.kv)?;
    Ok(ConfigService::new(store, kv, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_in_memory_service() {
        let mut config = AppConfig::default();
        config.kv.backend = KvBackend::Memory;
        let service = build_service(Arc::new(ArcSwap::from_pointee(config))).unwrap();

        let ns = service.create_namespace("billing", None).await.unwrap();
        let outcome = service.publish(ns.id).await.unwrap();
        assert!(outcome.flag_cleared);
    }
}
