//! Pending-restart tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bus::KernelNotification;
use crate::context::KernelContext;
use crate::error::KernelError;

/// External host capability that actually restarts the process.
pub trait RestartHost: Send + Sync {
    fn request_restart(&self) -> anyhow::Result<()>;
}

/// Tracks whether a change requires a process restart to take effect.
///
/// The flag moves from false to true at most once per kernel generation and
/// is cleared only by the restart itself; no software path resets it.
pub struct RestartCoordinator {
    pending: AtomicBool,
    host: Arc<dyn RestartHost>,
}

impl RestartCoordinator {
    pub fn new(host: Arc<dyn RestartHost>) -> Self {
        Self {
            pending: AtomicBool::new(false),
            host,
        }
    }

    pub fn has_pending_restart(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Mark a restart as pending.
    ///
    /// On the false→true transition, broadcasts a fresh system-info snapshot
    /// to connected clients and raises a local pending-restart-changed
    /// notification. Calling again while already pending does nothing.
    pub async fn notify_pending_restart(&self, ctx: &Arc<KernelContext>) {
        if self
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        tracing::info!("restart is now pending");

        match ctx.system_info().await {
            Ok(info) => match serde_json::to_value(&info) {
                Ok(payload) => ctx.transports().broadcast("RestartRequired", payload).await,
                Err(err) => tracing::warn!("system info snapshot not serializable: {err}"),
            },
            Err(err) => tracing::warn!("system info snapshot unavailable: {err}"),
        }
        ctx.bus().publish(KernelNotification::PendingRestartChanged { pending: true });
    }

    /// Restart the process through the host capability if a restart is
    /// pending; otherwise log and do nothing.
    pub fn perform_pending_restart(&self) -> Result<(), KernelError> {
        if !self.has_pending_restart() {
            tracing::info!("restart requested but none is pending; nothing to do");
            return Ok(());
        }
        tracing::info!("performing pending restart");
        self.host
            .request_restart()
            .map_err(|err| KernelError::Restart(format!("{err:#}")))
    }
}
