//! Stub collaborators backing the builder defaults.
//!
//! Hosts that have real transports, a real watcher, or a supervisor swap
//! these out; everything else (and most tests) runs against the stubs.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::TransportManager;
use crate::watch::DirectoryWatcher;
use crate::write_guard::{ItemRef, ItemRepository};

/// Watcher that suppresses nothing and watches nothing.
pub struct NullDirectoryWatcher;

impl DirectoryWatcher for NullDirectoryWatcher {
    fn start(&self) {}

    fn begin_ignore(&self, path: &Path) {
        tracing::trace!(path = %path.display(), "ignore window opened (null watcher)");
    }

    fn end_ignore(&self, path: &Path) {
        tracing::trace!(path = %path.display(), "ignore window closed (null watcher)");
    }

    fn dispose(&self) {}
}

/// Metadata index that records nothing.
pub struct NullItemRepository;

#[async_trait]
impl ItemRepository for NullItemRepository {
    async fn record_managed_path(&self, _item: &ItemRef, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Restart capability for hosts without a supervisor; only logs.
pub struct NullRestartHost;

impl crate::restart::RestartHost for NullRestartHost {
    fn request_restart(&self) -> anyhow::Result<()> {
        tracing::warn!("restart requested but no restart host is wired; ignoring");
        Ok(())
    }
}

/// In-memory transport manager recording broadcasts and disposal.
pub struct StubTransportManager {
    name: &'static str,
    sent: Mutex<Vec<(String, Value)>>,
    shut_down: AtomicBool,
}

impl StubTransportManager {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sent: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportManager for StubTransportManager {
    fn name(&self) -> &str {
        self.name
    }

    async fn broadcast_message(&self, event: &str, payload: Value) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((event.to_string(), payload));
        Ok(())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
