//! Request identification and request bodies.
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing; an incoming
//!   `x-request-id` is kept, otherwise a UUID v4 is generated
//! - Body types mirror the JSON the CLI sends; unknown fields are rejected

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::model::{FileId, NamespaceId};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a request ID to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// `POST /v1/namespaces`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNamespaceRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// `PUT /v1/namespaces/{id}`: the complete desired association set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNamespaceRequest {
    pub config_files: Vec<FileId>,
}

/// `POST /v1/config-files`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFileRequest {
    pub namespace_id: NamespaceId,
    pub filename: String,
    #[serde(default)]
    pub config: String,
}

/// `PUT /v1/config-files/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFileRequest {
    pub config: String,
}
