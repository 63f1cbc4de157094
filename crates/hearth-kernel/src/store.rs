//! Lazy, self-healing persistence for the configuration document.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::bus::{KernelNotification, NotificationBus};
use crate::codec::DocumentCodec;
use crate::config::ServerConfiguration;
use crate::error::KernelError;
use crate::paths::ApplicationPaths;
use crate::transport::TransportRegistry;

/// Result of a round-trip load: the document plus whether the on-disk bytes
/// were rewritten to the canonical form.
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub document: T,
    pub rewritten: bool,
}

/// Read a persisted document, defaulting it when absent, and rewrite the
/// file whenever the canonical re-serialization differs from what was read.
///
/// A document written by an older schema picks up defaults for new fields on
/// the first load and is persisted immediately, so no explicit migration
/// step exists anywhere in the kernel.
pub async fn load_round_trip<T>(
    codec: &DocumentCodec,
    path: &Path,
) -> Result<LoadOutcome<T>, KernelError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let existing = match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    let document: T = match &existing {
        Some(bytes) => codec.from_bytes(bytes)?,
        None => T::default(),
    };

    let canonical = codec.to_bytes(&document)?;
    let rewritten = existing.as_deref() != Some(canonical.as_slice());
    if rewritten {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, &canonical).await?;
        tracing::info!(path = %path.display(), "persisted canonical document form");
    }

    Ok(LoadOutcome { document, rewritten })
}

/// Thread-safe owner of the current configuration generation.
pub struct ConfigStore {
    paths: Arc<ApplicationPaths>,
    codec: DocumentCodec,
    bus: Arc<NotificationBus>,
    transports: Arc<TransportRegistry>,
    cached: Mutex<Option<Arc<ServerConfiguration>>>,
    save_lock: Mutex<()>,
    load_count: AtomicU64,
}

impl ConfigStore {
    pub fn new(
        paths: Arc<ApplicationPaths>,
        codec: DocumentCodec,
        bus: Arc<NotificationBus>,
        transports: Arc<TransportRegistry>,
    ) -> Self {
        Self {
            paths,
            codec,
            bus,
            transports,
            cached: Mutex::new(None),
            save_lock: Mutex::new(()),
            load_count: AtomicU64::new(0),
        }
    }

    /// The current configuration instance.
    ///
    /// When uninitialized, exactly one caller performs the disk load while
    /// concurrent callers wait behind the same lock and then observe the
    /// identical instance.
    pub async fn get(&self) -> Result<Arc<ServerConfiguration>, KernelError> {
        let mut slot = self.cached.lock().await;
        if let Some(config) = slot.as_ref() {
            return Ok(config.clone());
        }
        let outcome: LoadOutcome<ServerConfiguration> =
            load_round_trip(&self.codec, &self.paths.config_file()).await?;
        self.load_count.fetch_add(1, Ordering::Relaxed);
        let config = Arc::new(outcome.document);
        *slot = Some(config.clone());
        Ok(config)
    }

    /// Persist the current in-memory configuration and announce the update
    /// to local listeners and connected clients.
    pub async fn save(&self) -> Result<(), KernelError> {
        let config = self.get().await?;
        {
            let _write = self.save_lock.lock().await;
            let bytes = self.codec.to_bytes(&*config)?;
            let path = self.paths.config_file();
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&path, &bytes).await?;
        }
        self.bus.publish(KernelNotification::ConfigurationUpdated);
        let payload = serde_json::to_value(&*config)?;
        self.transports.broadcast("ConfigurationUpdated", payload).await;
        Ok(())
    }

    /// Replace the in-memory configuration and persist it.
    pub async fn apply(&self, config: ServerConfiguration) -> Result<(), KernelError> {
        {
            let mut slot = self.cached.lock().await;
            *slot = Some(Arc::new(config));
        }
        self.save().await
    }

    /// Drop the cached generation; the next [`get`](Self::get) reloads from
    /// disk.
    pub async fn invalidate(&self) {
        let mut slot = self.cached.lock().await;
        *slot = None;
    }

    /// Whether a configuration document already exists on disk. Used by the
    /// lifecycle's first-run probe before the first load.
    pub async fn config_file_exists(&self) -> Result<bool, KernelError> {
        Ok(tokio::fs::try_exists(self.paths.config_file()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Barrier;

    fn store_in(dir: &Path) -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new(
            Arc::new(ApplicationPaths::new(dir)),
            DocumentCodec,
            Arc::new(NotificationBus::new()),
            Arc::new(TransportRegistry::new()),
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_gets_load_exactly_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = store_in(tmp.path());

        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.get().await.unwrap()
            }));
        }

        let mut configs = Vec::new();
        for handle in handles {
            configs.push(handle.await.unwrap());
        }
        assert_eq!(store.load_count.load(Ordering::Relaxed), 1);
        for config in &configs[1..] {
            assert!(Arc::ptr_eq(&configs[0], config));
        }
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = store_in(tmp.path());

        let first = store.get().await.unwrap();
        store.invalidate().await;
        let second = store.get().await.unwrap();

        assert_eq!(store.load_count.load(Ordering::Relaxed), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn missing_file_is_seeded_with_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = store_in(tmp.path());

        assert!(!store.config_file_exists().await.unwrap());
        let config = store.get().await.unwrap();
        assert_eq!(*config, ServerConfiguration::default());
        assert!(store.config_file_exists().await.unwrap());
    }
}
