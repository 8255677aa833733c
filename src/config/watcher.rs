//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors and
//! deploy tools usually replace the file by rename, which ends a watch held on
//! the old inode.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Watches one configuration file and emits every valid new version of it.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|name| name.to_os_string());
        let path = self.path.clone();
        let tx = self.update_tx;

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event
                        .paths
                        .iter()
                        .any(|changed| changed.file_name().map(|n| n.to_os_string()) == file_name);
                if !relevant {
                    return;
                }
                match load_config(Some(&path)) {
                    Ok(config) => {
                        tracing::info!(path = ?path, "Configuration file changed, reloading");
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected configuration reload, keeping current configuration");
                    }
                }
            }
            Err(e) => tracing::error!(error = ?e, "Config watch error"),
        };

        let mut watcher = RecommendedWatcher::new(handler, Config::default().with_poll_interval(Duration::from_secs(2)))?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
