//! Managed-write behavior against the filesystem.

use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hearth_kernel::fixtures::{RecordingItemRepository, RecordingWatcher, WatchCall};
use hearth_kernel::write_guard::{FileWriteGuard, ItemRef};
use hearth_kernel::KernelError;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio_util::sync::CancellationToken;

fn guard() -> (FileWriteGuard, Arc<RecordingWatcher>, Arc<RecordingItemRepository>) {
    let watcher = Arc::new(RecordingWatcher::default());
    let items = Arc::new(RecordingItemRepository::default());
    let guard = FileWriteGuard::new(watcher.clone(), items.clone());
    (guard, watcher, items)
}

fn item() -> ItemRef {
    ItemRef { id: "movie-42".into(), name: "Some Movie".into() }
}

/// Reader that fails with an io error on the first read.
struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::other("disk on fire")))
    }
}

impl AsyncSeek for FailingReader {
    fn start_seek(self: Pin<&mut Self>, _position: std::io::SeekFrom) -> std::io::Result<()> {
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        Poll::Ready(Ok(0))
    }
}

/// Reader that never yields data after the rewind, parking the copy until
/// cancellation.
struct StallingReader;

impl AsyncRead for StallingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncSeek for StallingReader {
    fn start_seek(self: Pin<&mut Self>, _position: std::io::SeekFrom) -> std::io::Result<()> {
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        Poll::Ready(Ok(0))
    }
}

#[tokio::test]
async fn managed_write_copies_bytes_and_releases_the_window() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dest = tmp.path().join("artwork.bin");
    let (guard, watcher, items) = guard();

    let payload = b"poster bytes".to_vec();
    guard
        .write_managed(&item(), &dest, Cursor::new(payload.clone()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tokio::fs::read(&dest).await.unwrap(), payload);
    assert_eq!(
        watcher.calls(),
        vec![WatchCall::BeginIgnore(dest.clone()), WatchCall::EndIgnore(dest.clone())]
    );
    assert_eq!(items.records(), vec![("movie-42".to_string(), dest)]);
    assert!(guard.active_ignores().is_empty());
}

#[tokio::test]
async fn copy_failure_still_releases_the_window_and_skips_the_index() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dest = tmp.path().join("broken.bin");
    let (guard, watcher, items) = guard();

    let err = guard
        .write_managed(&item(), &dest, FailingReader, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, KernelError::Io(_)));
    assert_eq!(
        watcher.calls(),
        vec![WatchCall::BeginIgnore(dest.clone()), WatchCall::EndIgnore(dest)]
    );
    assert!(items.records().is_empty());
    assert!(guard.active_ignores().is_empty());
}

#[tokio::test]
async fn cancellation_during_the_copy_aborts_and_cleans_up() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dest = tmp.path().join("stalled.bin");
    let (guard, watcher, _items) = guard();
    let guard = Arc::new(guard);

    let token = CancellationToken::new();
    let write = {
        let guard = guard.clone();
        let token = token.clone();
        let dest = dest.clone();
        tokio::spawn(async move {
            guard.write_managed(&item(), &dest, StallingReader, &token).await
        })
    };

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    token.cancel();

    let err = write.await.unwrap().unwrap_err();
    assert!(matches!(err, KernelError::Cancelled));
    assert_eq!(
        watcher.calls(),
        vec![WatchCall::BeginIgnore(dest.clone()), WatchCall::EndIgnore(dest)]
    );
    assert!(guard.active_ignores().is_empty());
}

#[tokio::test]
async fn validation_failures_touch_neither_watcher_nor_filesystem() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dest = tmp.path().join("never-written.bin");
    let (guard, watcher, _items) = guard();

    let nameless = ItemRef { id: String::new(), name: String::new() };
    let err = guard
        .write_managed(&nameless, &dest, Cursor::new(b"x".to_vec()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, KernelError::InvalidArgument(_)));
    assert!(watcher.calls().is_empty());
    assert!(!tokio::fs::try_exists(&dest).await.unwrap());
}

#[tokio::test]
async fn source_is_rewound_before_the_copy() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dest = tmp.path().join("rewound.bin");
    let (guard, _watcher, _items) = guard();

    // A cursor that was already read to its end; the guard must rewind it.
    let mut source = Cursor::new(b"reusable buffer".to_vec());
    source.set_position(source.get_ref().len() as u64);

    guard
        .write_managed(&item(), &dest, source, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"reusable buffer");
}
