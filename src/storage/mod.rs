//! Durable store access.
//!
//! # Data Flow
//! ```text
//! service operation
//!     → Store::begin()            (one transaction per operation)
//!     → Transaction reads/writes  (private working state)
//!     → commit()                  (all-or-nothing)
//!       or drop                   (rollback, nothing visible)
//! ```
//!
//! # Design Decisions
//! - The relational store is an external collaborator; this trait is the
//!   narrow interface the core needs and nothing more
//! - Dropping a transaction without `commit` discards it, so `?` on any
//!   step is a full rollback
//! - `memory.rs` is the reference implementation; `snapshot.rs` makes it
//!   survive restarts

pub mod memory;
pub mod snapshot;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    ConfigFile, ConfigItem, FileId, ItemId, Namespace, NamespaceId, PublishEvent, StoredItem,
};

pub use memory::MemoryStore;

/// Errors raised by the durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A referenced row does not exist.
    #[error("{kind} [id={id}] does not exist")]
    Missing { kind: &'static str, id: i64 },

    /// A uniqueness or referential constraint was violated.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Snapshot file could not be read or written.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be encoded or decoded.
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Handle to the durable store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a transaction. Readers outside it never observe its writes
    /// until `commit` returns.
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>>;
}

/// A unit of work against the durable store.
#[async_trait]
pub trait Transaction: Send {
    async fn namespace(&mut self, id: NamespaceId) -> StorageResult<Option<Namespace>>;
    async fn find_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Option<Namespace>>;
    async fn namespaces(&mut self) -> StorageResult<Vec<Namespace>>;
    /// Insert a namespace in the initial (outdated) state.
    async fn insert_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Namespace>;
    /// Record a change event: the flag follows `PublishState::on(cause)` and
    /// the revision is bumped. `Published` is rejected; publishes go through
    /// `clear_outdated`.
    async fn mark_outdated(&mut self, id: NamespaceId, cause: PublishEvent) -> StorageResult<()>;
    /// Clear `outdated` if the revision still equals `revision`.
    /// Returns whether the flag was cleared.
    async fn clear_outdated(&mut self, id: NamespaceId, revision: u64) -> StorageResult<bool>;

    async fn file(&mut self, id: FileId) -> StorageResult<Option<ConfigFile>>;
    async fn find_file(
        &mut self,
        namespace_id: NamespaceId,
        name: &str,
    ) -> StorageResult<Option<ConfigFile>>;
    async fn files(&mut self) -> StorageResult<Vec<ConfigFile>>;
    async fn insert_file(&mut self, namespace_id: NamespaceId, name: &str) -> StorageResult<ConfigFile>;

    /// Items of a file in insertion order.
    async fn items(&mut self, file_id: FileId) -> StorageResult<Vec<StoredItem>>;
    async fn insert_item(&mut self, file_id: FileId, item: &ConfigItem) -> StorageResult<ItemId>;
    async fn update_item(&mut self, id: ItemId, item: &ConfigItem) -> StorageResult<()>;

    /// Files associated with a namespace, in association order.
    async fn associated_files(&mut self, namespace_id: NamespaceId) -> StorageResult<Vec<ConfigFile>>;
    /// Namespaces that include a file in their published set.
    async fn associating_namespaces(&mut self, file_id: FileId) -> StorageResult<Vec<NamespaceId>>;
    async fn associate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()>;
    async fn dissociate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()>;

    /// Make every write of this transaction visible atomically.
    async fn commit(self: Box<Self>) -> StorageResult<()>;
}
