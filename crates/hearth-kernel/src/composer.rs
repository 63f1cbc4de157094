//! Parallel plugin initialization with per-plugin fault isolation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::task::JoinSet;

use crate::context::KernelContext;
use crate::modules::{ModuleRegistry, ServerPlugin};

pub struct PluginComposer {
    registry: Arc<ModuleRegistry>,
    failed: Arc<RwLock<Vec<String>>>,
}

impl PluginComposer {
    /// `failed` is shared with the kernel context so system-info snapshots
    /// can report the current generation's failures.
    pub fn new(registry: Arc<ModuleRegistry>, failed: Arc<RwLock<Vec<String>>>) -> Self {
        Self { registry, failed }
    }

    /// Snapshot of registered plugin modules. Ordering is registry-defined
    /// and must not be relied upon.
    pub fn discover(&self) -> Vec<Arc<dyn ServerPlugin>> {
        self.registry.plugins()
    }

    /// Initialize every plugin concurrently.
    ///
    /// An error (or panic) in one plugin is logged with that plugin's name
    /// and version, recorded in the failed-module list, and never aborts a
    /// sibling or the surrounding reload. Returns once every branch has
    /// finished, forming the barrier the lifecycle needs before rebuilding
    /// transport managers.
    pub async fn initialize_all(
        &self,
        plugins: &[Arc<dyn ServerPlugin>],
        ctx: &Arc<KernelContext>,
    ) {
        self.failed.write().unwrap_or_else(|e| e.into_inner()).clear();
        if plugins.is_empty() {
            return;
        }

        let mut set = JoinSet::new();
        let mut labels = HashMap::new();
        for plugin in plugins {
            let plugin = plugin.clone();
            let ctx = ctx.clone();
            let label = format!("{} {}", plugin.name(), plugin.version());
            let handle = set.spawn(async move {
                let result = plugin.initialize(ctx).await;
                result.map_err(|err| format!("{err:#}"))
            });
            labels.insert(handle.id(), label);
        }

        let mut failed = Vec::new();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, Ok(()))) => {
                    let label = labels.get(&id).map(String::as_str).unwrap_or("<unknown>");
                    tracing::debug!(plugin = label, "plugin initialized");
                }
                Ok((id, Err(err))) => {
                    let label = labels.get(&id).map(String::as_str).unwrap_or("<unknown>");
                    tracing::error!(plugin = label, "plugin initialization failed: {err}");
                    failed.push(label.to_string());
                }
                Err(join_err) => {
                    let label = labels
                        .get(&join_err.id())
                        .map(String::as_str)
                        .unwrap_or("<unknown>");
                    tracing::error!(plugin = label, "plugin initialization panicked: {join_err}");
                    failed.push(label.to_string());
                }
            }
        }
        if !failed.is_empty() {
            tracing::warn!(count = failed.len(), "some plugins failed to initialize");
            self.failed.write().unwrap_or_else(|e| e.into_inner()).extend(failed);
        }
    }

    pub fn failed_modules(&self) -> Vec<String> {
        self.failed.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
