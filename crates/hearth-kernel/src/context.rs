//! The explicit kernel context handed to every collaborator.
//!
//! There is no global kernel singleton: plugins, hooks, and transports all
//! receive an `Arc<KernelContext>` at the seam where they are invoked and
//! reach kernel services only through it.

use std::sync::{Arc, RwLock};

use crate::bus::NotificationBus;
use crate::codec::DocumentCodec;
use crate::config::HostOptions;
use crate::error::KernelError;
use crate::paths::ApplicationPaths;
use crate::restart::RestartCoordinator;
use crate::store::ConfigStore;
use crate::system_info::SystemInfoSnapshot;
use crate::transport::TransportRegistry;
use crate::write_guard::FileWriteGuard;

pub struct KernelContext {
    pub(crate) paths: Arc<ApplicationPaths>,
    pub(crate) options: HostOptions,
    pub(crate) codec: DocumentCodec,
    pub(crate) bus: Arc<NotificationBus>,
    pub(crate) transports: Arc<TransportRegistry>,
    pub(crate) config: Arc<ConfigStore>,
    pub(crate) write_guard: Arc<FileWriteGuard>,
    pub(crate) restart: RestartCoordinator,
    pub(crate) failed_modules: Arc<RwLock<Vec<String>>>,
}

impl KernelContext {
    pub fn paths(&self) -> &ApplicationPaths {
        &self.paths
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    /// Serializer collaborator for persisted documents.
    pub fn codec(&self) -> &DocumentCodec {
        &self.codec
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn transports(&self) -> &TransportRegistry {
        &self.transports
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn write_guard(&self) -> &FileWriteGuard {
        &self.write_guard
    }

    pub fn restart(&self) -> &RestartCoordinator {
        &self.restart
    }

    /// Mark a restart as pending; see
    /// [`RestartCoordinator::notify_pending_restart`].
    pub async fn notify_pending_restart(self: &Arc<Self>) {
        self.restart.notify_pending_restart(self).await;
    }

    /// Assemble the current status snapshot.
    pub async fn system_info(&self) -> Result<SystemInfoSnapshot, KernelError> {
        let config = self.config.get().await?;
        let failed_modules = self
            .failed_modules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        Ok(SystemInfoSnapshot {
            has_pending_restart: self.restart.has_pending_restart(),
            version: self.options.version.clone(),
            is_network_deployed: self.options.is_network_deployed,
            web_socket_port_number: config.websocket_port,
            supports_native_web_socket: config.enable_native_websocket,
            failed_modules,
        })
    }
}
