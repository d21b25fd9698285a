//! API handlers. Each one is a thin adapter over a `ConfigService` method.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::http::request::{
    CreateFileRequest, CreateNamespaceRequest, UpdateFileRequest, UpdateNamespaceRequest,
};
use crate::http::response::{ApiResponse, ApiResult};
use crate::model::{FileBrief, FileId, FileView, Namespace, NamespaceBrief, NamespaceId};
use crate::reconcile::AssociationDiff;
use crate::service::{ConfigService, EditOutcome, FileCreated, PublishOutcome, WatchTarget};

pub type ServiceState = Arc<ConfigService>;

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn list_namespaces(State(service): State<ServiceState>) -> ApiResult<Vec<NamespaceBrief>> {
    Ok(ApiResponse::ok(service.list_namespaces().await?))
}

pub async fn create_namespace(
    State(service): State<ServiceState>,
    Json(request): Json<CreateNamespaceRequest>,
) -> ApiResult<Namespace> {
    let namespace = service
        .create_namespace(&request.name, request.environment.as_deref())
        .await?;
    Ok(ApiResponse::created(namespace))
}

pub async fn get_namespace(
    State(service): State<ServiceState>,
    Path(id): Path<NamespaceId>,
) -> ApiResult<NamespaceBrief> {
    Ok(ApiResponse::ok(service.render_namespace(id).await?))
}

pub async fn update_namespace(
    State(service): State<ServiceState>,
    Path(id): Path<NamespaceId>,
    Json(request): Json<UpdateNamespaceRequest>,
) -> ApiResult<AssociationDiff> {
    Ok(ApiResponse::ok(
        service.reconcile_association(id, &request.config_files).await?,
    ))
}

pub async fn publish_namespace(
    State(service): State<ServiceState>,
    Path(id): Path<NamespaceId>,
) -> ApiResult<PublishOutcome> {
    Ok(ApiResponse::ok(service.publish(id).await?))
}

pub async fn watch_namespace(
    State(service): State<ServiceState>,
    Path(id): Path<NamespaceId>,
) -> ApiResult<WatchTarget> {
    Ok(ApiResponse::ok(service.watch_target(id).await?))
}

pub async fn list_files(State(service): State<ServiceState>) -> ApiResult<Vec<FileBrief>> {
    Ok(ApiResponse::ok(service.list_files().await?))
}

pub async fn create_file(
    State(service): State<ServiceState>,
    Json(request): Json<CreateFileRequest>,
) -> ApiResult<FileCreated> {
    let created = service
        .create_file(request.namespace_id, &request.filename, &request.config)
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_file(
    State(service): State<ServiceState>,
    Path(id): Path<FileId>,
) -> ApiResult<FileView> {
    Ok(ApiResponse::ok(service.render_file(id).await?))
}

pub async fn update_file(
    State(service): State<ServiceState>,
    Path(id): Path<FileId>,
    Json(request): Json<UpdateFileRequest>,
) -> ApiResult<EditOutcome> {
    Ok(ApiResponse::ok(service.edit_file(id, &request.config).await?))
}
