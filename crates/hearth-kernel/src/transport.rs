//! Transport collaborator seams.
//!
//! The kernel never speaks HTTP or TCP itself; it owns opaque managers that
//! it recreates on reload and disposes on shutdown. Broadcasts to connected
//! clients go through the TCP-facing manager.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

#[async_trait]
pub trait TransportManager: Send + Sync {
    fn name(&self) -> &str;

    /// Push a named message to every connected client.
    async fn broadcast_message(&self, event: &str, payload: Value) -> anyhow::Result<()>;

    /// Release sockets and worker tasks. Safe to call more than once.
    async fn shutdown(&self);
}

/// Slots for the current generation's transport managers.
///
/// Replacing a slot disposes the previous occupant first; `shutdown` empties
/// both slots (TCP before HTTP) and is idempotent because emptied slots are
/// skipped.
#[derive(Default)]
pub struct TransportRegistry {
    http: RwLock<Option<Arc<dyn TransportManager>>>,
    tcp: RwLock<Option<Arc<dyn TransportManager>>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace_http(&self, manager: Arc<dyn TransportManager>) {
        let mut slot = self.http.write().await;
        if let Some(old) = slot.take() {
            old.shutdown().await;
        }
        tracing::debug!(manager = manager.name(), "http manager installed");
        *slot = Some(manager);
    }

    pub async fn replace_tcp(&self, manager: Arc<dyn TransportManager>) {
        let mut slot = self.tcp.write().await;
        if let Some(old) = slot.take() {
            old.shutdown().await;
        }
        tracing::debug!(manager = manager.name(), "tcp manager installed");
        *slot = Some(manager);
    }

    /// Broadcast to connected clients; transport failures are logged, never
    /// surfaced to the caller.
    pub async fn broadcast(&self, event: &str, payload: Value) {
        let manager = self.tcp.read().await.clone();
        let Some(manager) = manager else {
            tracing::debug!(event, "broadcast skipped; no tcp manager installed");
            return;
        };
        if let Err(err) = manager.broadcast_message(event, payload).await {
            tracing::warn!(event, "broadcast failed: {err:#}");
        }
    }

    /// Dispose both managers in reverse-dependency order: TCP first, then
    /// HTTP.
    pub async fn shutdown(&self) {
        if let Some(tcp) = self.tcp.write().await.take() {
            tcp.shutdown().await;
        }
        if let Some(http) = self.http.write().await.take() {
            http.shutdown().await;
        }
    }
}
