//! Kernel-local notification dispatch.
//!
//! An explicit observer registry: listeners subscribe to one notification
//! kind and are invoked in subscription order on a task spawned per publish,
//! so a publisher never blocks on its listeners and never observes their
//! failures. A listener error is logged and the remaining listeners still
//! run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

/// Events announced by kernel components as state changes happen.
#[derive(Debug, Clone)]
pub enum KernelNotification {
    ReloadBeginning,
    LoggerReloaded,
    ConfigurationUpdated,
    PendingRestartChanged { pending: bool },
    ReloadCompleted { first_run: bool },
}

impl KernelNotification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::ReloadBeginning => NotificationKind::ReloadBeginning,
            Self::LoggerReloaded => NotificationKind::LoggerReloaded,
            Self::ConfigurationUpdated => NotificationKind::ConfigurationUpdated,
            Self::PendingRestartChanged { .. } => NotificationKind::PendingRestartChanged,
            Self::ReloadCompleted { .. } => NotificationKind::ReloadCompleted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ReloadBeginning,
    LoggerReloaded,
    ConfigurationUpdated,
    PendingRestartChanged,
    ReloadCompleted,
}

#[async_trait]
pub trait NotificationListener: Send + Sync {
    async fn on_notification(&self, event: KernelNotification) -> anyhow::Result<()>;
}

/// Handle returned by [`NotificationBus::subscribe`]; pass back to
/// [`NotificationBus::unsubscribe`] to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct NotificationBus {
    listeners: RwLock<HashMap<NotificationKind, Vec<(u64, Arc<dyn NotificationListener>)>>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: NotificationKind,
        listener: Arc<dyn NotificationListener>,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.entry(kind).or_default().push((id, listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        for entries in listeners.values_mut() {
            entries.retain(|(entry_id, _)| *entry_id != id.0);
        }
    }

    /// Dispatch `event` to its subscribers without blocking the caller.
    ///
    /// Listeners run in subscription order on a spawned task. Must be called
    /// from within a tokio runtime.
    pub fn publish(&self, event: KernelNotification) {
        let targets: Vec<Arc<dyn NotificationListener>> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            match listeners.get(&event.kind()) {
                Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };
        if targets.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for listener in targets {
                if let Err(err) = listener.on_notification(event.clone()).await {
                    tracing::warn!(kind = ?event.kind(), "notification listener failed: {err:#}");
                }
            }
        });
    }
}
