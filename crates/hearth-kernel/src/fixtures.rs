//! Recording test doubles for kernel collaborators.
//!
//! Compiled into the library behind the `test-fixtures` feature so both the
//! unit tests and the integration tests under `tests/` can share them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bus::{KernelNotification, NotificationListener};
use crate::context::KernelContext;
use crate::modules::ServerPlugin;
use crate::watch::DirectoryWatcher;
use crate::write_guard::{ItemRef, ItemRepository};

/// Ordered, cloneable log shared between a test and its collaborators.
#[derive(Debug, Default, Clone)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Ignore-window calls observed by [`RecordingWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCall {
    BeginIgnore(PathBuf),
    EndIgnore(PathBuf),
}

/// Watcher that records its ignore-window timeline.
#[derive(Default)]
pub struct RecordingWatcher {
    calls: Mutex<Vec<WatchCall>>,
    started: AtomicBool,
    disposals: AtomicUsize,
}

impl RecordingWatcher {
    pub fn calls(&self) -> Vec<WatchCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl DirectoryWatcher for RecordingWatcher {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn begin_ignore(&self, path: &Path) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(WatchCall::BeginIgnore(path.to_path_buf()));
    }

    fn end_ignore(&self, path: &Path) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(WatchCall::EndIgnore(path.to_path_buf()));
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Metadata index recording every `(item id, path)` registration.
#[derive(Default)]
pub struct RecordingItemRepository {
    records: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingItemRepository {
    pub fn records(&self) -> Vec<(String, PathBuf)> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ItemRepository for RecordingItemRepository {
    async fn record_managed_path(&self, item: &ItemRef, path: &Path) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((item.id.clone(), path.to_path_buf()));
        Ok(())
    }
}

/// How a [`TestPlugin`] behaves when initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginMode {
    Succeed,
    Fail,
    Panic,
}

/// Plugin double that logs its initialization and optionally misbehaves.
pub struct TestPlugin {
    name: String,
    version: String,
    mode: PluginMode,
    log: EventLog,
}

impl TestPlugin {
    pub fn new(name: &str, version: &str, mode: PluginMode, log: EventLog) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            mode,
            log,
        }
    }
}

#[async_trait]
impl ServerPlugin for TestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn initialize(&self, _ctx: Arc<KernelContext>) -> anyhow::Result<()> {
        self.log.push(format!("plugin:{}", self.name));
        match self.mode {
            PluginMode::Succeed => Ok(()),
            PluginMode::Fail => anyhow::bail!("{} refuses to initialize", self.name),
            PluginMode::Panic => panic!("{} panicked during initialize", self.name),
        }
    }
}

/// Restart host counting how often the process restart was requested.
#[derive(Default)]
pub struct RecordingRestartHost {
    requests: AtomicUsize,
}

impl RecordingRestartHost {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl crate::restart::RestartHost for RecordingRestartHost {
    fn request_restart(&self) -> anyhow::Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Bus listener that logs each received notification kind.
pub struct BusProbe {
    label: &'static str,
    log: EventLog,
}

impl BusProbe {
    pub fn new(label: &'static str, log: EventLog) -> Self {
        Self { label, log }
    }
}

#[async_trait]
impl NotificationListener for BusProbe {
    async fn on_notification(&self, _event: KernelNotification) -> anyhow::Result<()> {
        self.log.push(self.label);
        Ok(())
    }
}
