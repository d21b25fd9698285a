//! Distributed key-value store client.
//!
//! # Responsibilities
//! - Put one merged document under one key on a set of endpoints
//! - Bound every put by the configured dial + request timeouts
//! - Fail over between endpoints of the same cluster
//!
//! # Design Decisions
//! - Endpoints are passed per call; which cluster a namespace publishes to
//!   is decided by the caller from `KvConfig`
//! - No retries inside the client; a failed put surfaces to the caller,
//!   which leaves the namespace dirty and can retry
//! - `etcd.rs` talks to the etcd v3 JSON gateway; `memory.rs` keeps values
//!   in-process for development and tests

pub mod etcd;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::KvConfig;

pub use etcd::EtcdGateway;
pub use memory::MemoryKv;

/// Errors raised while publishing to the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// The put did not complete within dial + request timeout.
    #[error("KV put to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    /// The endpoint could not be reached.
    #[error("KV endpoint {endpoint} unreachable: {message}")]
    Connect { endpoint: String, message: String },

    /// The endpoint answered with a non-success status.
    #[error("KV endpoint {endpoint} rejected put with status {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// No endpoints are configured for the namespace's environment.
    #[error("No KV endpoints configured for environment '{environment}'")]
    NoEndpoints { environment: String },

    /// Every endpoint of the cluster failed.
    #[error("All {tried} KV endpoints failed, last error: {last}")]
    AllEndpointsFailed {
        tried: usize,
        #[source]
        last: Box<KvError>,
    },

    /// The client itself could not be built.
    #[error("KV client error: {0}")]
    Client(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// Deadlines applied to a single put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    pub dial_timeout: Duration,
    pub request_timeout: Duration,
}

impl PutOptions {
    pub fn from_config(config: &KvConfig) -> Self {
        Self {
            dial_timeout: config.dial_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Upper bound on one attempt against one endpoint.
    pub fn deadline(&self) -> Duration {
        self.dial_timeout + self.request_timeout
    }
}

impl Default for PutOptions {
    fn default() -> Self {
        Self::from_config(&KvConfig::default())
    }
}

/// A key-value store that published documents are written to.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write `value` under `key`, overwriting any previous value.
    async fn put(
        &self,
        endpoints: &[String],
        key: &str,
        value: &str,
        options: &PutOptions,
    ) -> KvResult<()>;

    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}
