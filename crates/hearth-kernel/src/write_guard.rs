//! Managed writes quarantined from the directory watcher.
//!
//! Every byte the kernel writes into watched directories goes through
//! [`FileWriteGuard::write_managed`], which wraps the write in an ignore
//! window so the watcher never reports the kernel's own writes as external
//! edits. The window is released on every exit path; that guarantee is this
//! component's correctness contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::KernelError;
use crate::watch::DirectoryWatcher;

const COPY_CHUNK: usize = 64 * 1024;

/// Reference to the library item that owns a managed file.
#[derive(Debug, Clone)]
pub struct ItemRef {
    pub id: String,
    pub name: String,
}

/// Metadata index collaborator: records which paths belong to which item.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn record_managed_path(&self, item: &ItemRef, path: &Path) -> anyhow::Result<()>;
}

pub struct FileWriteGuard {
    watcher: Arc<dyn DirectoryWatcher>,
    items: Arc<dyn ItemRepository>,
    /// Active ignore windows, reference-counted per normalized path so the
    /// watcher suppression survives until the last concurrent writer to a
    /// path completes.
    active: Mutex<HashMap<PathBuf, usize>>,
}

impl FileWriteGuard {
    pub fn new(watcher: Arc<dyn DirectoryWatcher>, items: Arc<dyn ItemRepository>) -> Self {
        watcher.start();
        Self {
            watcher,
            items,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Paths currently under write-quarantine.
    pub fn active_ignores(&self) -> Vec<PathBuf> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.keys().cloned().collect()
    }

    /// Stream `source` into `path` on behalf of `item`.
    ///
    /// Validates arguments and the token before touching anything, holds an
    /// ignore window for the duration of the copy, records the written path
    /// in the item's metadata index on success, and releases the window
    /// unconditionally afterwards, whether the copy succeeded, was
    /// cancelled, or failed.
    pub async fn write_managed<S>(
        &self,
        item: &ItemRef,
        path: &Path,
        source: S,
        token: &CancellationToken,
    ) -> Result<(), KernelError>
    where
        S: AsyncRead + AsyncSeek + Unpin + Send,
    {
        if item.id.is_empty() {
            return Err(KernelError::InvalidArgument("item id is empty".into()));
        }
        if path.as_os_str().is_empty() {
            return Err(KernelError::InvalidArgument("destination path is empty".into()));
        }
        if token.is_cancelled() {
            return Err(KernelError::Cancelled);
        }

        let key = normalize(path);
        self.begin_ignore(&key);
        let result = self.copy_and_record(item, path, source, token).await;
        self.end_ignore(&key);
        result
    }

    async fn copy_and_record<S>(
        &self,
        item: &ItemRef,
        path: &Path,
        mut source: S,
        token: &CancellationToken,
    ) -> Result<(), KernelError>
    where
        S: AsyncRead + AsyncSeek + Unpin + Send,
    {
        // Rewind so an in-memory buffer can be reused across retries.
        source.seek(std::io::SeekFrom::Start(0)).await?;

        let mut dest = tokio::fs::File::create(path).await?;
        let mut buf = vec![0u8; COPY_CHUNK];
        loop {
            let read = tokio::select! {
                _ = token.cancelled() => return Err(KernelError::Cancelled),
                read = source.read(&mut buf) => read?,
            };
            if read == 0 {
                break;
            }
            dest.write_all(&buf[..read]).await?;
        }
        dest.flush().await?;
        drop(dest);
        drop(source);

        self.items
            .record_managed_path(item, path)
            .await
            .map_err(|err| KernelError::ItemIndex(format!("{err:#}")))?;
        Ok(())
    }

    fn begin_ignore(&self, key: &Path) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let count = active.entry(key.to_path_buf()).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.watcher.begin_ignore(key);
        }
    }

    fn end_ignore(&self, key: &Path) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.get_mut(key) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                active.remove(key);
                self.watcher.end_ignore(key);
            }
            None => tracing::warn!(path = %key.display(), "ignore window released twice"),
        }
    }

    /// Dispose the watch collaborator. Idempotent by the watcher's contract.
    pub fn shutdown(&self) {
        self.watcher.dispose();
    }
}

/// Normalize a path for use as an ignore-window key: current-dir components
/// and redundant separators dropped.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
