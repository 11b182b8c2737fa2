//! Per-request configuration resolution.
//!
//! # Data Flow
//! ```text
//! ConfigProvider::resolve()
//!     → primary store (TOML file as of its last reload)
//!     → secondary store (last-known-good snapshot)
//!     → ProxyConfig::default()
//! ```
//!
//! The first store that answers wins. A good primary load refreshes the
//! snapshot so the next failure still has something recent to fall back on.
//! Resolving never touches the disk: the file store is re-read only when the
//! watcher reports a change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::validation::validate_proxy;

/// A source of rewrite configuration.
pub trait ConfigStore: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn load(&self) -> Result<ProxyConfig, ConfigError>;
}

/// The `[proxy]` section of a TOML settings file, as of the last reload.
///
/// While the file is unreadable or invalid the store fails every load, which
/// sends the provider to the snapshot.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    current: ArcSwap<Result<ProxyConfig, String>>,
}

impl FileConfigStore {
    /// Open `path` and read it once.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            current: ArcSwap::from_pointee(Err("not loaded".to_string())),
        };
        if let Err(e) = store.reload() {
            tracing::warn!(path = ?store.path, error = %e, "Config file store starts empty");
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file.
    pub fn reload(&self) -> Result<(), ConfigError> {
        match load_config(&self.path) {
            Ok(settings) => {
                self.current.store(Arc::new(Ok(settings.proxy)));
                Ok(())
            }
            Err(e) => {
                self.current.store(Arc::new(Err(e.to_string())));
                Err(e)
            }
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let current = self.current.load();
        match &**current {
            Ok(config) => Ok(config.clone()),
            Err(reason) => Err(ConfigError::Unavailable(reason.clone())),
        }
    }
}

/// Holds the last configuration known to be good.
#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<ProxyConfig>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Invalid configurations are refused.
    pub fn store(&self, config: ProxyConfig) -> Result<(), ConfigError> {
        validate_proxy(&config).map_err(ConfigError::Validation)?;
        self.current.store(Some(Arc::new(config)));
        Ok(())
    }

    pub fn snapshot(&self) -> Option<Arc<ProxyConfig>> {
        self.current.load_full()
    }
}

impl ConfigStore for SnapshotStore {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn load(&self) -> Result<ProxyConfig, ConfigError> {
        self.current
            .load_full()
            .map(|config| (*config).clone())
            .ok_or_else(|| ConfigError::Unavailable("no snapshot recorded".to_string()))
    }
}

/// Resolves the configuration for one request cycle.
pub struct ConfigProvider {
    primary: Option<Arc<dyn ConfigStore>>,
    snapshot: Arc<SnapshotStore>,
}

impl ConfigProvider {
    pub fn new(primary: Option<Arc<dyn ConfigStore>>, snapshot: Arc<SnapshotStore>) -> Self {
        Self { primary, snapshot }
    }

    /// A provider that always answers with the given configuration.
    pub fn fixed(config: ProxyConfig) -> Self {
        let snapshot = Arc::new(SnapshotStore::new());
        if let Err(e) = snapshot.store(config) {
            tracing::warn!(error = %e, "Fixed configuration rejected, using defaults");
        }
        Self::new(None, snapshot)
    }

    /// Primary, then snapshot, then the hardcoded default.
    pub fn resolve(&self) -> ProxyConfig {
        if let Some(primary) = &self.primary {
            match primary.load() {
                Ok(config) => {
                    if self.snapshot.snapshot().as_deref() != Some(&config) {
                        if let Err(e) = self.snapshot.store(config.clone()) {
                            tracing::warn!(error = %e, "Primary configuration not snapshotted");
                        }
                    }
                    return config;
                }
                Err(e) => {
                    tracing::debug!(store = primary.name(), error = %e, "Primary config store failed, falling back");
                }
            }
        }

        match self.snapshot.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "No config snapshot, using defaults");
                ProxyConfig::default()
            }
        }
    }
}
