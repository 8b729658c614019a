//! Credential Slot Implementations
//!
//! [`FileTokenStorage`] keeps the access credential in a single file so that
//! every process of the application observes the same value, mirroring the
//! browser's same-origin storage. Changes made by other processes are picked
//! up through a `notify` filesystem watcher with a polling fallback and
//! published on the watch channel.
//!
//! [`MemoryTokenStorage`] keeps the slot in the watch channel itself; shared
//! via `Arc`, it models multiple contexts of one origin inside a single
//! process, which is what the tests use.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::TokenStorage};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// File-backed credential slot with cross-process change notification.
pub struct FileTokenStorage {
    path: PathBuf,
    tx: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
}

impl FileTokenStorage {
    /// Open (or create the parent directory for) the credential file and
    /// start watching it for external changes.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_poll_interval(path, Duration::from_secs(5)).await
    }

    /// Like [`FileTokenStorage::new`] with a custom polling fallback
    /// interval. The watcher reacts to filesystem events immediately; the
    /// poll only covers platforms or mounts where events are unreliable.
    pub async fn with_poll_interval(path: impl Into<PathBuf>, poll: Duration) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = read_slot(&path).await?;
        let (tx, _) = watch::channel(initial);
        let shutdown = CancellationToken::new();

        tokio::spawn(watch_loop(
            path.clone(),
            tx.clone(),
            shutdown.clone(),
            poll,
        ));

        debug!(path = %path.display(), "Opened credential slot");
        Ok(Self { path, tx, shutdown })
    }

    fn publish(&self, value: Option<String>) {
        self.tx.send_if_modified(|current| {
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        });
    }
}

impl Drop for FileTokenStorage {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<Option<String>> {
        read_slot(&self.path).await
    }

    async fn persist(&self, value: &str) -> Result<()> {
        tokio::fs::write(&self.path, value).await?;
        self.publish(Some(value.to_string()));
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.publish(None);
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

/// Read the slot file; a missing or empty file is an empty slot.
async fn read_slot(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Re-read the slot on filesystem events (with a polling fallback) and
/// publish changes. Runs until the storage handle is dropped.
async fn watch_loop(
    path: PathBuf,
    tx: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
    poll: Duration,
) {
    let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
    let _watcher = setup_notify_watcher(&path, wake_tx);
    let mut interval = tokio::time::interval(poll);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            // A closed wake channel (watcher setup failed) must not spin;
            // the pattern disables the branch and polling carries the load.
            Some(_) = wake_rx.recv() => {}
            _ = interval.tick() => {}
        }

        match read_slot(&path).await {
            Ok(value) => {
                tx.send_if_modified(|current| {
                    if *current != value {
                        debug!(present = value.is_some(), "Adopting external credential change");
                        *current = value;
                        true
                    } else {
                        false
                    }
                });
            }
            Err(e) => warn!(error = %e, "Failed to re-read credential slot"),
        }
    }
}

/// Set up a `notify` watcher on the slot file's parent directory so file
/// creation and deletion are detected too. Returns the watcher handle (must
/// be kept alive); `None` falls back to polling only.
fn setup_notify_watcher(
    path: &Path,
    wake_tx: mpsc::Sender<()>,
) -> Option<notify::RecommendedWatcher> {
    use notify::{RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |_: notify::Result<notify::Event>| {
        let _ = wake_tx.try_send(());
    })
    .ok()?;

    let watch_path = path.parent().unwrap_or(path);
    watcher.watch(watch_path, RecursiveMode::NonRecursive).ok()?;

    Some(watcher)
}

/// In-process credential slot. The watch channel is the storage.
#[derive(Debug)]
pub struct MemoryTokenStorage {
    tx: watch::Sender<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }
}

impl Default for MemoryTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.tx.borrow().clone())
    }

    async fn persist(&self, value: &str) -> Result<()> {
        let value = value.to_string();
        self.tx.send_if_modified(|current| {
            if current.as_deref() != Some(value.as_str()) {
                *current = Some(value);
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                *current = None;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
