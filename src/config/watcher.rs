//! Configuration file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::provider::FileConfigStore;

/// Monitors the configuration file and reloads the file store on change.
pub struct ConfigWatcher {
    path: PathBuf,
    store: Arc<FileConfigStore>,
}

impl ConfigWatcher {
    pub fn new(store: Arc<FileConfigStore>) -> Self {
        Self {
            path: store.path().to_path_buf(),
            store,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are
    /// wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match store.reload() {
                            Ok(()) => tracing::info!("Config file reloaded"),
                            Err(e) => {
                                tracing::error!("Failed to reload config: {}. Serving last good snapshot.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
