//! Config file creation and read views.

use serde::Serialize;

use crate::codec::{collapse_duplicates, parse, serialize, ParseWarning};
use crate::model::{ConfigItem, FileBrief, FileId, FileView, NamespaceId, PublishEvent};
use crate::observability::metrics;
use crate::service::editor::merge_items;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::namespaces::file_brief;
use crate::service::validate_name;
use crate::storage::Store;

/// Result of creating a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCreated {
    #[serde(flatten)]
    pub file: FileBrief,
    pub items: usize,
    pub warnings: Vec<ParseWarning>,
}

/// Create a file owned by `namespace_id`, associate it with its owner and
/// store the parsed items, all in one transaction. The owner becomes
/// outdated.
pub async fn create_file(
    store: &dyn Store,
    namespace_id: NamespaceId,
    name: &str,
    text: &str,
) -> ServiceResult<FileCreated> {
    let name = validate_name("file name", name)?;
    let parsed = parse(text);
    metrics::record_parse_warnings(parsed.warnings.len());
    let items = collapse_duplicates(parsed.items);

    let mut tx = store.begin().await?;
    let owner = tx
        .namespace(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", namespace_id))?;
    if tx.find_file(namespace_id, name).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "config file '{}/{}' already exists",
            owner.full_name(),
            name
        )));
    }

    let file = tx.insert_file(namespace_id, name).await?;
    tx.associate(namespace_id, file.id).await?;
    let (_, inserted) = merge_items(tx.as_mut(), file.id, &items).await?;
    tx.mark_outdated(namespace_id, PublishEvent::AssociationChanged).await?;
    tx.commit().await?;

    let brief = FileBrief::new(&file, &owner);
    tracing::info!(file = %brief.full_name, id = %file.id, items = inserted, "Config file created");

    Ok(FileCreated {
        file: brief,
        items: inserted,
        warnings: parsed.warnings,
    })
}

/// Every config file, in creation order.
pub async fn list_files(store: &dyn Store) -> ServiceResult<Vec<FileBrief>> {
    let mut tx = store.begin().await?;
    let mut out = Vec::new();
    for file in tx.files().await? {
        out.push(file_brief(tx.as_mut(), &file).await?);
    }
    Ok(out)
}

/// A file with its items serialized in the editing format.
pub async fn render_file(store: &dyn Store, file_id: FileId) -> ServiceResult<FileView> {
    let mut tx = store.begin().await?;
    let file = tx
        .file(file_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("config file", file_id))?;
    let items: Vec<ConfigItem> = tx.items(file_id).await?.into_iter().map(|s| s.item).collect();
    Ok(FileView {
        brief: file_brief(tx.as_mut(), &file).await?,
        config: serialize(&items),
    })
}
