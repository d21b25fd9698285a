//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use confgate::config::{AppConfig, KvBackend};
use confgate::kv::MemoryKv;
use confgate::model::{
    ConfigFile, ConfigItem, FileId, ItemId, Namespace, NamespaceId, PublishEvent, StoredItem,
};
use confgate::storage::{MemoryStore, StorageError, StorageResult, Store, Transaction};
use confgate::{ConfigService, HttpServer, Shutdown};

/// Config for tests: in-memory KV with one default endpoint.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.kv.backend = KvBackend::Memory;
    config.kv.default_endpoints = vec!["mem://default".to_string()];
    config.observability.metrics_enabled = false;
    config
}

/// A service over the given store and an inspectable in-memory KV.
pub fn service_with(store: Arc<dyn Store>, config: AppConfig) -> (Arc<ConfigService>, Arc<MemoryKv>) {
    let kv = Arc::new(MemoryKv::new());
    let live = Arc::new(ArcSwap::from_pointee(config));
    let service = Arc::new(ConfigService::new(store, kv.clone(), live));
    (service, kv)
}

/// Serve the API on an ephemeral port. Returns its address and the
/// shutdown handle that stops it.
pub async fn spawn_server(service: Arc<ConfigService>, config: &AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, service);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a programmable HTTP backend on an ephemeral port. `f` receives the
/// request body and returns status and response body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let body = read_request_body(&mut socket).await;
                let (status, body) = f(body).await;
                let status_text = match status {
                    200 => "200 OK",
                    400 => "400 Bad Request",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + length {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return String::from_utf8_lossy(&buf[end + 4..]).to_string();
        }
    }
    String::new()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Transaction steps a `FaultyStore` can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Associate,
    Dissociate,
    MarkOutdated,
    ClearOutdated,
    UpdateItem,
    InsertItem,
    Commit,
}

/// A `MemoryStore` that fails a chosen step with a backend error.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    fail_at: Arc<Mutex<Option<FailPoint>>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at(&self, point: Option<FailPoint>) {
        *self.fail_at.lock().unwrap() = point;
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fail_at: self.fail_at.clone(),
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn Transaction>,
    fail_at: Arc<Mutex<Option<FailPoint>>>,
}

impl FaultyTransaction {
    fn check(&self, point: FailPoint) -> StorageResult<()> {
        if *self.fail_at.lock().unwrap() == Some(point) {
            return Err(StorageError::Backend(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for FaultyTransaction {
    async fn namespace(&mut self, id: NamespaceId) -> StorageResult<Option<Namespace>> {
        self.inner.namespace(id).await
    }

    async fn find_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Option<Namespace>> {
        self.inner.find_namespace(name, environment).await
    }

    async fn namespaces(&mut self) -> StorageResult<Vec<Namespace>> {
        self.inner.namespaces().await
    }

    async fn insert_namespace(
        &mut self,
        name: &str,
        environment: Option<&str>,
    ) -> StorageResult<Namespace> {
        self.inner.insert_namespace(name, environment).await
    }

    async fn mark_outdated(&mut self, id: NamespaceId, cause: PublishEvent) -> StorageResult<()> {
        self.check(FailPoint::MarkOutdated)?;
        self.inner.mark_outdated(id, cause).await
    }

    async fn clear_outdated(&mut self, id: NamespaceId, revision: u64) -> StorageResult<bool> {
        self.check(FailPoint::ClearOutdated)?;
        self.inner.clear_outdated(id, revision).await
    }

    async fn file(&mut self, id: FileId) -> StorageResult<Option<ConfigFile>> {
        self.inner.file(id).await
    }

    async fn find_file(
        &mut self,
        namespace_id: NamespaceId,
        name: &str,
    ) -> StorageResult<Option<ConfigFile>> {
        self.inner.find_file(namespace_id, name).await
    }

    async fn files(&mut self) -> StorageResult<Vec<ConfigFile>> {
        self.inner.files().await
    }

    async fn insert_file(&mut self, namespace_id: NamespaceId, name: &str) -> StorageResult<ConfigFile> {
        self.inner.insert_file(namespace_id, name).await
    }

    async fn items(&mut self, file_id: FileId) -> StorageResult<Vec<StoredItem>> {
        self.inner.items(file_id).await
    }

    async fn insert_item(&mut self, file_id: FileId, item: &ConfigItem) -> StorageResult<ItemId> {
        self.check(FailPoint::InsertItem)?;
        self.inner.insert_item(file_id, item).await
    }

    async fn update_item(&mut self, id: ItemId, item: &ConfigItem) -> StorageResult<()> {
        self.check(FailPoint::UpdateItem)?;
        self.inner.update_item(id, item).await
    }

    async fn associated_files(&mut self, namespace_id: NamespaceId) -> StorageResult<Vec<ConfigFile>> {
        self.inner.associated_files(namespace_id).await
    }

    async fn associating_namespaces(&mut self, file_id: FileId) -> StorageResult<Vec<NamespaceId>> {
        self.inner.associating_namespaces(file_id).await
    }

    async fn associate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()> {
        self.check(FailPoint::Associate)?;
        self.inner.associate(namespace_id, file_id).await
    }

    async fn dissociate(&mut self, namespace_id: NamespaceId, file_id: FileId) -> StorageResult<()> {
        self.check(FailPoint::Dissociate)?;
        self.inner.dissociate(namespace_id, file_id).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.check(FailPoint::Commit)?;
        self.inner.commit().await
    }
}

/// Current state of a namespace straight from the store.
pub async fn namespace(store: &dyn Store, id: NamespaceId) -> Namespace {
    let mut tx = store.begin().await.unwrap();
    tx.namespace(id).await.unwrap().unwrap()
}

/// Items of a file straight from the store.
pub async fn items(store: &dyn Store, id: FileId) -> Vec<ConfigItem> {
    let mut tx = store.begin().await.unwrap();
    tx.items(id).await.unwrap().into_iter().map(|s| s.item).collect()
}
