//! Namespace creation and read views.

use crate::config::KvConfig;
use crate::model::{ConfigFile, FileBrief, Namespace, NamespaceBrief, NamespaceId};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::publisher::{target_for, WatchTarget};
use crate::service::validate_name;
use crate::storage::{Store, Transaction};

/// Create a namespace. It starts outdated with no associated files.
pub async fn create_namespace(
    store: &dyn Store,
    name: &str,
    environment: Option<&str>,
) -> ServiceResult<Namespace> {
    let name = validate_name("namespace name", name)?;
    let environment = match environment.map(str::trim) {
        None | Some("") => None,
        Some(env) => Some(validate_name("environment", env)?),
    };

    let mut tx = store.begin().await?;
    if tx.find_namespace(name, environment).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "namespace '{}' already exists",
            full_name(name, environment)
        )));
    }
    let namespace = tx.insert_namespace(name, environment).await?;
    tx.commit().await?;

    tracing::info!(namespace = %namespace.full_name(), id = %namespace.id, "Namespace created");
    Ok(namespace)
}

fn full_name(name: &str, environment: Option<&str>) -> String {
    match environment {
        Some(env) => format!("{}/{}", name, env),
        None => name.to_string(),
    }
}

pub(crate) async fn file_brief(tx: &mut dyn Transaction, file: &ConfigFile) -> ServiceResult<FileBrief> {
    let owner = tx
        .namespace(file.namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", file.namespace_id))?;
    Ok(FileBrief::new(file, &owner))
}

async fn brief(tx: &mut dyn Transaction, namespace: Namespace) -> ServiceResult<NamespaceBrief> {
    let mut config_files = Vec::new();
    for file in tx.associated_files(namespace.id).await? {
        config_files.push(file_brief(tx, &file).await?);
    }
    Ok(NamespaceBrief {
        id: namespace.id,
        full_name: namespace.full_name(),
        name: namespace.name,
        environment: namespace.environment,
        outdated: namespace.outdated,
        config_files,
    })
}

/// Identity, outdated flag and associated files of one namespace.
pub async fn render_namespace(store: &dyn Store, namespace_id: NamespaceId) -> ServiceResult<NamespaceBrief> {
    let mut tx = store.begin().await?;
    let namespace = tx
        .namespace(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", namespace_id))?;
    brief(tx.as_mut(), namespace).await
}

/// Every namespace, in creation order.
pub async fn list_namespaces(store: &dyn Store) -> ServiceResult<Vec<NamespaceBrief>> {
    let mut tx = store.begin().await?;
    let mut out = Vec::new();
    for namespace in tx.namespaces().await? {
        out.push(brief(tx.as_mut(), namespace).await?);
    }
    Ok(out)
}

/// Key and endpoints a downstream watcher of this namespace should use.
pub async fn watch_target(
    store: &dyn Store,
    config: &KvConfig,
    namespace_id: NamespaceId,
) -> ServiceResult<WatchTarget> {
    let mut tx = store.begin().await?;
    let namespace = tx
        .namespace(namespace_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("namespace", namespace_id))?;
    Ok(target_for(&namespace, config)?)
}
