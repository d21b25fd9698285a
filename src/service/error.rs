//! Service-level errors.

use thiserror::Error;

use crate::kv::KvError;
use crate::storage::StorageError;

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed or references unknown records. Nothing was
    /// mutated.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The target record does not exist.
    #[error("{kind} [id={id}] not found")]
    NotFound { kind: &'static str, id: i64 },

    /// A record with the same identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The durable store failed; the transaction was rolled back.
    #[error(transparent)]
    Persistence(#[from] StorageError),

    /// The KV put failed; the namespace stays outdated.
    #[error("Publish failed: {0}")]
    Publish(#[from] KvError),
}

impl ServiceError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<i64>) -> Self {
        ServiceError::NotFound { kind, id: id.into() }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
