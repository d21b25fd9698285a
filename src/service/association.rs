//! Association reconciliation.

use std::collections::BTreeSet;

use crate::model::{FileId, NamespaceId, PublishEvent};
use crate::observability::metrics;
use crate::reconcile::{diff, AssociationDiff};
use crate::service::error::{ServiceError, ServiceResult};
use crate::storage::Store;

/// Make a namespace's associated files equal `desired`.
///
/// Validation happens before any write. An empty diff writes nothing and
/// leaves the outdated flag alone; otherwise the adds, removes and the dirty
/// transition commit together.
pub async fn reconcile_association(
    store: &dyn Store,
    namespace_id: NamespaceId,
    desired: &[FileId],
) -> ServiceResult<AssociationDiff> {
    let mut tx = store.begin().await?;

    let namespace = tx
        .namespace(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", namespace_id))?;

    let desired: BTreeSet<FileId> = desired.iter().copied().collect();
    let mut unknown = Vec::new();
    for id in &desired {
        if tx.file(*id).await?.is_none() {
            unknown.push(id.to_string());
        }
    }
    if !unknown.is_empty() {
        return Err(ServiceError::Validation(format!(
            "unknown config file ids: {}",
            unknown.join(", ")
        )));
    }

    let current = tx.associated_files(namespace_id).await?;
    let changes = diff(desired, current.iter().map(|f| f.id));

    if changes.is_empty() {
        tracing::debug!(namespace = %namespace.full_name(), "Association set unchanged");
        return Ok(changes);
    }

    for file_id in &changes.to_add {
        tx.associate(namespace_id, *file_id).await?;
    }
    for file_id in &changes.to_remove {
        tx.dissociate(namespace_id, *file_id).await?;
    }

    tx.mark_outdated(namespace_id, PublishEvent::AssociationChanged).await?;
    tx.commit().await?;

    tracing::info!(
        namespace = %namespace.full_name(),
        added = changes.to_add.len(),
        removed = changes.to_remove.len(),
        "Association set reconciled"
    );
    metrics::record_reconcile(changes.to_add.len(), changes.to_remove.len());

    Ok(changes)
}
