//! Config file editing.
//!
//! # Design Decisions
//! - Union merge: keys present in the submission are updated or inserted,
//!   keys absent from it are kept untouched
//! - Repeated keys in one submission collapse before anything is written
//! - A submission that changes nothing never commits, so no namespace
//!   leaves Clean because of it

use std::collections::HashMap;

use serde::Serialize;

use crate::codec::{collapse_duplicates, parse, ParseWarning};
use crate::model::{ConfigItem, FileId, NamespaceId, PublishEvent, StoredItem};
use crate::observability::metrics;
use crate::service::error::{ServiceError, ServiceResult};
use crate::storage::{StorageResult, Store, Transaction};

/// What an edit did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub updated: usize,
    pub inserted: usize,
    /// Namespaces marked outdated by this edit.
    pub dirtied: Vec<NamespaceId>,
    pub warnings: Vec<ParseWarning>,
}

impl EditOutcome {
    pub fn changed(&self) -> bool {
        self.updated + self.inserted > 0
    }
}

/// Update changed items and insert new ones. Returns (updated, inserted).
pub(crate) async fn merge_items(
    tx: &mut dyn Transaction,
    file_id: FileId,
    incoming: &[ConfigItem],
) -> StorageResult<(usize, usize)> {
    let existing = tx.items(file_id).await?;
    let by_key: HashMap<&str, &StoredItem> = existing
        .iter()
        .map(|stored| (stored.item.key.as_str(), stored))
        .collect();

    let (mut updated, mut inserted) = (0, 0);
    for item in incoming {
        match by_key.get(item.key.as_str()) {
            Some(stored) if stored.item.differs_from(item) => {
                tx.update_item(stored.id, item).await?;
                updated += 1;
            }
            Some(_) => {}
            None => {
                tx.insert_item(file_id, item).await?;
                inserted += 1;
            }
        }
    }
    Ok((updated, inserted))
}

/// Merge `text` into a config file and dirty every namespace that
/// publishes it.
pub async fn edit_file(store: &dyn Store, file_id: FileId, text: &str) -> ServiceResult<EditOutcome> {
    let parsed = parse(text);
    metrics::record_parse_warnings(parsed.warnings.len());
    let incoming = collapse_duplicates(parsed.items);

    let mut tx = store.begin().await?;
    let file = tx
        .file(file_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("config file", file_id))?;

    let (updated, inserted) = merge_items(tx.as_mut(), file_id, &incoming).await?;
    let mut outcome = EditOutcome {
        updated,
        inserted,
        dirtied: Vec::new(),
        warnings: parsed.warnings,
    };

    if !outcome.changed() {
        tracing::debug!(file = %file.name, file_id = %file_id, "Edit changed nothing");
        return Ok(outcome);
    }

    for namespace_id in tx.associating_namespaces(file_id).await? {
        tx.mark_outdated(namespace_id, PublishEvent::ContentChanged).await?;
        outcome.dirtied.push(namespace_id);
    }
    tx.commit().await?;

    tracing::info!(
        file = %file.name,
        file_id = %file_id,
        updated = outcome.updated,
        inserted = outcome.inserted,
        dirtied = outcome.dirtied.len(),
        warnings = outcome.warnings.len(),
        "Config file edited"
    );
    metrics::record_edit(outcome.updated, outcome.inserted);

    Ok(outcome)
}
