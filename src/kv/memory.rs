//! Process-local key-value store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::kv::{KvError, KvResult, KvStore, PutOptions};

/// A `KvStore` that keeps the latest value per key in memory.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
    failing: AtomicBool,
    puts: AtomicU64,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Make every following put fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of accepted puts.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn put(
        &self,
        endpoints: &[String],
        key: &str,
        value: &str,
        _options: &PutOptions,
    ) -> KvResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(KvError::Connect {
                endpoint: endpoints.first().cloned().unwrap_or_default(),
                message: "memory store set to fail".to_string(),
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
