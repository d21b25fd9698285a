//! Shutdown coordination.
//!
//! A single `watch` flag flips from `false` to `true` once. Listeners that
//! subscribe after the flip still observe it, so a signal arriving while the
//! server is still binding is not lost.

use std::sync::Arc;

use tokio::sync::watch;

/// Handle that requests a graceful stop. Clones share the flag.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request shutdown. Only the first call is logged; later calls are no-ops.
    pub fn trigger(&self, reason: &str) {
        if !self.tx.send_replace(true) {
            tracing::info!(reason, listeners = self.listeners(), "Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribed signals not yet dropped.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side handed to the HTTP server.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered. If every `Shutdown` handle is
    /// dropped first, this never resolves.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
