//! JSON snapshot persistence for the in-memory store.

use std::path::{Path, PathBuf};

use crate::storage::memory::Tables;
use crate::storage::StorageResult;

/// A snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load tables if the file exists.
    pub fn load(&self) -> StorageResult<Option<Tables>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        let tables: Tables = serde_json::from_slice(&bytes)?;
        tracing::info!(
            path = %self.path.display(),
            namespaces = tables.namespaces.len(),
            files = tables.files.len(),
            "Loaded store snapshot"
        );
        Ok(Some(tables))
    }

    /// Write tables through a temporary file and rename over the target, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub async fn save(&self, tables: &Tables) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(tables)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Saved store snapshot");
        Ok(())
    }
}
