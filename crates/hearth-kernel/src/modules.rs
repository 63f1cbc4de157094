//! Capability contracts and the explicit module registry.
//!
//! Modules register themselves during startup instead of being discovered by
//! runtime scanning; the lifecycle queries the registry afresh on every
//! reload. Query results are snapshots whose ordering is registry-defined
//! and must not be relied upon.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::context::KernelContext;

/// An independently-authored plugin module.
///
/// `name` and `version` are used only for logging; initialization failures
/// are isolated by the composer and never abort a reload.
#[async_trait]
pub trait ServerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    async fn initialize(&self, ctx: Arc<KernelContext>) -> anyhow::Result<()>;
}

/// A REST endpoint handler handed to the HTTP-facing manager.
pub trait RestService: Send + Sync {
    fn route(&self) -> &str;
}

/// A websocket message listener handed to the TCP-facing manager.
pub trait WebSocketListener: Send + Sync {
    fn name(&self) -> &str;
}

/// One reload generation's registry query results.
#[derive(Clone, Default)]
pub struct ComposedParts {
    pub rest_services: Vec<Arc<dyn RestService>>,
    pub websocket_listeners: Vec<Arc<dyn WebSocketListener>>,
    pub plugins: Vec<Arc<dyn ServerPlugin>>,
}

#[derive(Default)]
pub struct ModuleRegistry {
    plugins: RwLock<Vec<Arc<dyn ServerPlugin>>>,
    rest_services: RwLock<Vec<Arc<dyn RestService>>>,
    websocket_listeners: RwLock<Vec<Arc<dyn WebSocketListener>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_plugin(&self, plugin: Arc<dyn ServerPlugin>) {
        tracing::debug!(name = plugin.name(), version = plugin.version(), "plugin registered");
        self.plugins.write().unwrap_or_else(|e| e.into_inner()).push(plugin);
    }

    pub fn register_rest_service(&self, service: Arc<dyn RestService>) {
        self.rest_services.write().unwrap_or_else(|e| e.into_inner()).push(service);
    }

    pub fn register_websocket_listener(&self, listener: Arc<dyn WebSocketListener>) {
        self.websocket_listeners.write().unwrap_or_else(|e| e.into_inner()).push(listener);
    }

    pub fn plugins(&self) -> Vec<Arc<dyn ServerPlugin>> {
        self.plugins.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn rest_services(&self) -> Vec<Arc<dyn RestService>> {
        self.rest_services.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn websocket_listeners(&self) -> Vec<Arc<dyn WebSocketListener>> {
        self.websocket_listeners.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Query every capability the transports and composer need for one
    /// reload generation.
    pub fn compose(&self) -> ComposedParts {
        ComposedParts {
            rest_services: self.rest_services(),
            websocket_listeners: self.websocket_listeners(),
            plugins: self.plugins(),
        }
    }
}
