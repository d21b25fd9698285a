//! Core operations on namespaces and config files.
//!
//! # Data Flow
//! ```text
//! HTTP handler / CLI
//!     → ConfigService method
//!     → free function taking the store (and KV client) explicitly
//!         association.rs  reconcile_association
//!         editor.rs       edit_file
//!         publisher.rs    publish
//!         namespaces.rs   create / list / render / watch target
//!         files.rs        create / list / render
//! ```
//!
//! # Design Decisions
//! - Each operation runs in its own transaction; nothing is cached between
//!   calls, so publish always reads current persisted state
//! - KV settings are read from the live config on every call, so a config
//!   reload changes endpoints for the next publish
//! - No retries here; a failed publish leaves the namespace outdated and
//!   the caller decides whether to retry

pub mod association;
pub mod editor;
pub mod error;
pub mod files;
pub mod namespaces;
pub mod publisher;

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::AppConfig;
use crate::kv::KvStore;
use crate::model::{FileBrief, FileId, FileView, Namespace, NamespaceBrief, NamespaceId};
use crate::reconcile::AssociationDiff;
use crate::storage::Store;

pub use editor::EditOutcome;
pub use error::{ServiceError, ServiceResult};
pub use files::FileCreated;
pub use publisher::{PublishOutcome, WatchTarget};

/// Characters that would break publish keys or the document format.
const RESERVED: &[char] = &['/', '[', ']', '#', '='];

/// Trim and check a user-supplied name.
pub(crate) fn validate_name<'a>(what: &str, value: &'a str) -> ServiceResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", what)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control() || RESERVED.contains(&c)) {
        return Err(ServiceError::Validation(format!(
            "{} '{}' contains whitespace or one of {:?}",
            what, value, RESERVED
        )));
    }
    Ok(value)
}

/// Entry point bundling the store, the KV client and the live config.
#[derive(Clone)]
pub struct ConfigService {
    store: Arc<dyn Store>,
    kv: Arc<dyn KvStore>,
    config: Arc<ArcSwap<AppConfig>>,
}

impl ConfigService {
    pub fn new(store: Arc<dyn Store>, kv: Arc<dyn KvStore>, config: Arc<ArcSwap<AppConfig>>) -> Self {
        Self { store, kv, config }
    }

    /// Live configuration handle.
    pub fn config(&self) -> &Arc<ArcSwap<AppConfig>> {
        &self.config
    }

    pub async fn create_namespace(&self, name: &str, environment: Option<&str>) -> ServiceResult<Namespace> {
        namespaces::create_namespace(self.store.as_ref(), name, environment).await
    }

    pub async fn list_namespaces(&self) -> ServiceResult<Vec<NamespaceBrief>> {
        namespaces::list_namespaces(self.store.as_ref()).await
    }

    pub async fn render_namespace(&self, namespace_id: NamespaceId) -> ServiceResult<NamespaceBrief> {
        namespaces::render_namespace(self.store.as_ref(), namespace_id).await
    }

    pub async fn reconcile_association(
        &self,
        namespace_id: NamespaceId,
        file_ids: &[FileId],
    ) -> ServiceResult<AssociationDiff> {
        association::reconcile_association(self.store.as_ref(), namespace_id, file_ids).await
    }

    pub async fn publish(&self, namespace_id: NamespaceId) -> ServiceResult<PublishOutcome> {
        let config = self.config.load_full();
        publisher::publish(self.store.as_ref(), self.kv.as_ref(), &config.kv, namespace_id).await
    }

    pub async fn watch_target(&self, namespace_id: NamespaceId) -> ServiceResult<WatchTarget> {
        let config = self.config.load_full();
        namespaces::watch_target(self.store.as_ref(), &config.kv, namespace_id).await
    }

    pub async fn create_file(
        &self,
        namespace_id: NamespaceId,
        name: &str,
        text: &str,
    ) -> ServiceResult<FileCreated> {
        files::create_file(self.store.as_ref(), namespace_id, name, text).await
    }

    pub async fn list_files(&self) -> ServiceResult<Vec<FileBrief>> {
        files::list_files(self.store.as_ref()).await
    }

    pub async fn render_file(&self, file_id: FileId) -> ServiceResult<FileView> {
        files::render_file(self.store.as_ref(), file_id).await
    }

    pub async fn edit_file(&self, file_id: FileId, text: &str) -> ServiceResult<EditOutcome> {
        editor::edit_file(self.store.as_ref(), file_id, text).await
    }
}
