//! Configuration file watcher for hot reload.
//!
//! Uses notify's poll backend so change detection is based on the file's
//! modification time and works the same on every platform.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A watcher that signals when the configuration file changes.
///
/// It only reports that a change happened; reading and rebuilding is left to
/// the reload controller so that all file I/O stays on the async runtime.
pub struct ConfigWatcher {
    path: PathBuf,
    poll_interval: Duration,
    change_tx: mpsc::UnboundedSender<()>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver of change notifications.
    pub fn new(path: &Path, poll_interval: Duration) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                poll_interval,
                change_tx,
            },
            change_rx,
        )
    }

    /// Start polling. The returned watcher must be kept alive for as long as
    /// notifications are wanted; dropping it stops the poll thread.
    pub fn run(self) -> Result<PollWatcher, notify::Error> {
        let tx = self.change_tx;
        let path = self.path.clone();

        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = %path.display(), "Config file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(
            path = %self.path.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Config watcher started"
        );
        Ok(watcher)
    }
}
