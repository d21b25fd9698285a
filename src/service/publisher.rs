//! Aggregation and publish.
//!
//! # Data Flow
//! ```text
//! read transaction  → namespace + associated files + items (then dropped)
//!     → render_document
//!     → KvStore::put(endpoints, key, document)   no store lock held here
//!     → clear transaction: clear_outdated(revision read above)
//! ```
//!
//! # Design Decisions
//! - The flag is only touched after the put succeeded
//! - The flag is only cleared if the namespace revision did not move while
//!   the put was in flight; a concurrent change keeps it outdated
//! - Failing to clear the flag after a successful put is not an error for
//!   the caller: the document is out, the namespace merely stays outdated

use std::time::Instant;

use serde::Serialize;

use crate::codec::{render_document, Section};
use crate::config::KvConfig;
use crate::kv::{KvError, KvStore, PutOptions};
use crate::model::{ConfigFile, ConfigItem, Namespace, NamespaceId};
use crate::observability::metrics;
use crate::service::error::{ServiceError, ServiceResult};
use crate::storage::{StorageResult, Store};

/// What a successful publish did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub namespace_id: NamespaceId,
    pub key: String,
    pub endpoints: Vec<String>,
    /// Number of files merged into the document.
    pub files: usize,
    /// Size of the published document.
    pub bytes: usize,
    /// False if the namespace changed during the put or the flag write
    /// failed; the namespace then stays outdated.
    pub flag_cleared: bool,
}

/// Where a downstream consumer finds a namespace's published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    pub key: String,
    pub endpoints: Vec<String>,
}

/// Namespace state as read at the start of a publish.
pub(crate) struct Materialized {
    pub namespace: Namespace,
    pub files: Vec<(ConfigFile, Vec<ConfigItem>)>,
}

impl Materialized {
    pub fn render(&self) -> String {
        let sections: Vec<Section<'_>> = self
            .files
            .iter()
            .map(|(file, items)| Section {
                name: &file.name,
                items,
            })
            .collect();
        render_document(&sections)
    }
}

pub(crate) async fn materialize(store: &dyn Store, namespace_id: NamespaceId) -> ServiceResult<Materialized> {
    let mut tx = store.begin().await?;
    let namespace = tx
        .namespace(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", namespace_id))?;

    let mut files = Vec::new();
    for file in tx.associated_files(namespace_id).await? {
        let items = tx.items(file.id).await?.into_iter().map(|s| s.item).collect();
        files.push((file, items));
    }
    Ok(Materialized { namespace, files })
}

/// Key and endpoints for a namespace under the given KV settings.
pub(crate) fn target_for(namespace: &Namespace, config: &KvConfig) -> Result<WatchTarget, KvError> {
    let endpoints = config.endpoints_for(namespace.environment.as_deref()).to_vec();
    if endpoints.is_empty() {
        return Err(KvError::NoEndpoints {
            environment: namespace.environment.clone().unwrap_or_else(|| "default".to_string()),
        });
    }
    Ok(WatchTarget {
        key: namespace.publish_key(&config.key_prefix),
        endpoints,
    })
}

/// Merge a namespace's files and push the document to the KV store.
pub async fn publish(
    store: &dyn Store,
    kv: &dyn KvStore,
    config: &KvConfig,
    namespace_id: NamespaceId,
) -> ServiceResult<PublishOutcome> {
    let start = Instant::now();
    let snapshot = materialize(store, namespace_id).await?;
    let namespace = &snapshot.namespace;
    let target = target_for(namespace, config)?;
    let document = snapshot.render();

    if let Err(e) = kv
        .put(&target.endpoints, &target.key, &document, &PutOptions::from_config(config))
        .await
    {
        tracing::error!(
            namespace = %namespace.full_name(),
            key = %target.key,
            error = %e,
            "Publish failed, namespace stays outdated"
        );
        metrics::record_publish(kv.backend(), "error", document.len(), start);
        return Err(e.into());
    }
    metrics::record_publish(kv.backend(), "ok", document.len(), start);

    let flag_cleared = match clear_flag(store, namespace).await {
        Ok(cleared) => {
            if !cleared {
                tracing::info!(
                    namespace = %namespace.full_name(),
                    "Namespace changed while publishing, keeping it outdated"
                );
            }
            cleared
        }
        Err(e) => {
            tracing::error!(
                namespace = %namespace.full_name(),
                key = %target.key,
                error = %e,
                "Published but failed to clear outdated flag"
            );
            metrics::record_flag_clear_failure("storage");
            false
        }
    };

    tracing::info!(
        namespace = %namespace.full_name(),
        key = %target.key,
        files = snapshot.files.len(),
        bytes = document.len(),
        flag_cleared,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Namespace published"
    );

    Ok(PublishOutcome {
        namespace_id,
        key: target.key,
        endpoints: target.endpoints,
        files: snapshot.files.len(),
        bytes: document.len(),
        flag_cleared,
    })
}

async fn clear_flag(store: &dyn Store, namespace: &Namespace) -> StorageResult<bool> {
    let mut tx = store.begin().await?;
    let cleared = tx.clear_outdated(namespace.id, namespace.revision).await?;
    if cleared {
        tx.commit().await?;
    }
    Ok(cleared)
}
