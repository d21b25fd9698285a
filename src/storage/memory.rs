//! In-memory transactional store.
//!
//! # Design Decisions
//! - One writer at a time: `begin` takes an owned lock on the committed
//!   tables and works on a private copy
//! - `commit` persists the copy (when a snapshot file is configured) before
//!   swapping it in, so a failed write leaves committed state untouched
//! - Row order is insertion order, which is the "storage order" publish uses

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    Association, ConfigFile, ConfigItem, FileId, ItemId, Namespace, NamespaceId, PublishEvent,
    PublishState, StoredItem,
};
use crate::storage::snapshot::SnapshotFile;
use crate::storage::{StorageError, StorageResult, Store, Transaction};

/// All rows of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub(crate) next_namespace_id: i64,
    pub(crate) next_file_id: i64,
    pub(crate) next_item_id: i64,
    pub(crate) namespaces: Vec<Namespace>,
    pub(crate) files: Vec<ConfigFile>,
    pub(crate) items: Vec<StoredItem>,
    pub(crate) associations: Vec<Association>,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn namespace_mut(&mut self, id: NamespaceId) -> StorageResult<&mut Namespace> {
        self.namespaces
            .iter_mut()
            .find(|ns| ns.id == id)
            .ok_or(StorageError::Missing { kind: "namespace", id: id.0 })
    }

    fn has_namespace(&self, id: NamespaceId) -> bool {
        self.namespaces.iter().any(|ns| ns.id == id)
    }

    fn has_file(&self, id: FileId) -> bool {
        self.files.iter().any(|f| f.id == id)
    }
}

/// Reference implementation of [`Store`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    snapshot: Option<Arc<SnapshotFile>>,
    commits: Arc<AtomicU64>,
}

impl MemoryStore {
    /// A store that lives only as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store backed by a snapshot file, loading it if present.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let snapshot = SnapshotFile::new(path);
        let tables = snapshot.load()?.unwrap_or_default();
        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            snapshot: Some(Arc::new(snapshot)),
            commits: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of committed transactions since this handle was created.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            snapshot: self.snapshot.clone(),
            commits: self.commits.clone(),
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    snapshot: Option<Arc<SnapshotFile>>,
    commits: Arc<AtomicU64>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn namespace(&mut self, id: NamespaceId) -> StorageResult<Option<Namespace>> {
        Ok(self.working.namespaces.iter().find(|ns| ns.id == id).cloned())
    }

    async fn find_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Option<Namespace>> {
        Ok(self
            .working
            .namespaces
            .iter()
            .find(|ns| ns.name == name && ns.environment.as_deref() == environment)
            .cloned())
    }

    async fn namespaces(&mut self) -> StorageResult<Vec<Namespace>> {
        Ok(self.working.namespaces.clone())
    }

    async fn insert_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Namespace> {
        if self.find_namespace(name, environment).await?.is_some() {
            return Err(StorageError::Constraint(format!(
                "namespace [name={}] [environment={:?}] already exists",
                name, environment
            )));
        }
        let namespace = Namespace {
            id: NamespaceId(next_id(&mut self.working.next_namespace_id)),
            name: name.to_string(),
            environment: environment.map(str::to_string),
            outdated: PublishState::INITIAL.is_outdated(),
            revision: 0,
        };
        self.working.namespaces.push(namespace.clone());
        Ok(namespace)
    }

    async fn mark_outdated(&mut self, id: NamespaceId, cause: PublishEvent) -> StorageResult<()> {
        if cause == PublishEvent::Published {
            return Err(StorageError::Constraint(
                "publish events must pass the revision check".to_string(),
            ));
        }
        self.working.namespace_mut(id)?.apply(cause);
        Ok(())
    }

    async fn clear_outdated(&mut self, id: NamespaceId, revision: u64) -> StorageResult<bool> {
        let ns = self.working.namespace_mut(id)?;
        if ns.revision != revision {
            return Ok(false);
        }
        ns.apply(PublishEvent::Published);
        Ok(true)
    }

    async fn file(&mut self, id: FileId) -> StorageResult<Option<ConfigFile>> {
        Ok(self.working.files.iter().find(|f| f.id == id).cloned())
    }

    async fn find_file(
        &mut self,
        namespace_id: NamespaceId,
        name: &str,
    ) -> StorageResult<Option<ConfigFile>> {
        Ok(self
            .working
            .files
            .iter()
            .find(|f| f.namespace_id == namespace_id && f.name == name)
            .cloned())
    }

    async fn files(&mut self) -> StorageResult<Vec<ConfigFile>> {
        Ok(self.working.files.clone())
    }

    async fn insert_file(&mut self, namespace_id: NamespaceId, name: &str) -> StorageResult<ConfigFile> {
        if !self.working.has_namespace(namespace_id) {
            return Err(StorageError::Missing { kind: "namespace", id: namespace_id.0 });
        }
        if self.find_file(namespace_id, name).await?.is_some() {
            return Err(StorageError::Constraint(format!(
                "config file [name={}] [namespace_id={}] already exists",
                name, namespace_id
            )));
        }
        let file = ConfigFile {
            id: FileId(next_id(&mut self.working.next_file_id)),
            name: name.to_string(),
            namespace_id,
        };
        self.working.files.push(file.clone());
        Ok(file)
    }

    async fn items(&mut self, file_id: FileId) -> StorageResult<Vec<StoredItem>> {
        Ok(self
            .working
            .items
            .iter()
            .filter(|stored| stored.file_id == file_id)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, file_id: FileId, item: &ConfigItem) -> StorageResult<ItemId> {
        if !self.working.has_file(file_id) {
            return Err(StorageError::Missing { kind: "config file", id: file_id.0 });
        }
        let duplicate = self
            .working
            .items
            .iter()
            .any(|stored| stored.file_id == file_id && stored.item.key == item.key);
        if duplicate {
            return Err(StorageError::Constraint(format!(
                "config item [key={}] already exists in file [id={}]",
                item.key, file_id
            )));
        }
        let id = ItemId(next_id(&mut self.working.next_item_id));
        self.working.items.push(StoredItem {
            id,
            file_id,
            item: item.clone(),
        });
        Ok(id)
    }

    async fn update_item(&mut self, id: ItemId, item: &ConfigItem) -> StorageResult<()> {
        let stored = self
            .working
            .items
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or(StorageError::Missing { kind: "config item", id: id.0 })?;
        stored.item.value = item.value.clone();
        stored.item.comment = item.comment.clone();
        Ok(())
    }

    async fn associated_files(&mut self, namespace_id: NamespaceId) -> StorageResult<Vec<ConfigFile>> {
        let tables = &self.working;
        tables
            .associations
            .iter()
            .filter(|a| a.namespace_id == namespace_id)
            .map(|a| {
                tables
                    .files
                    .iter()
                    .find(|f| f.id == a.file_id)
                    .cloned()
                    .ok_or(StorageError::Missing { kind: "config file", id: a.file_id.0 })
            })
            .collect()
    }

    async fn associating_namespaces(&mut self, file_id: FileId) -> StorageResult<Vec<NamespaceId>> {
        Ok(self
            .working
            .associations
            .iter()
            .filter(|a| a.file_id == file_id)
            .map(|a| a.namespace_id)
            .collect())
    }

    async fn associate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()> {
        if !self.working.has_namespace(namespace_id) {
            return Err(StorageError::Missing { kind: "namespace", id: namespace_id.0 });
        }
        if !self.working.has_file(file_id) {
            return Err(StorageError::Missing { kind: "config file", id: file_id.0 });
        }
        let association = Association { namespace_id, file_id };
        if self.working.associations.contains(&association) {
            return Err(StorageError::Constraint(format!(
                "file [id={}] is already associated with namespace [id={}]",
                file_id, namespace_id
            )));
        }
        self.working.associations.push(association);
        Ok(())
    }

    async fn dissociate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()> {
        let before = self.working.associations.len();
        self.working
            .associations
            .retain(|a| !(a.namespace_id == namespace_id && a.file_id == file_id));
        if self.working.associations.len() == before {
            return Err(StorageError::Missing { kind: "association", id: file_id.0 });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let MemoryTransaction {
            mut guard,
            working,
            snapshot,
            commits,
        } = *self;

        if let Some(snapshot) = snapshot {
            snapshot.save(&working).await?;
        }
        *guard = working;
        commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
