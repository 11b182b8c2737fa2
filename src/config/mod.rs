//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (server/observability/cache read once at startup)
//!
//! Per request (no disk access):
//!     provider.rs resolves ProxyConfig
//!     → file store, else last-known-good snapshot, else defaults
//!
//! On file change:
//!     watcher.rs detects change
//!     → file store reloads through loader.rs
//!     → next good resolve refreshes the snapshot
//! ```
//!
//! # Design Decisions
//! - A request never sees a config mutate mid-flight; it works on its own copy
//! - All fields have defaults to allow minimal configs
//! - Unknown rule kinds fail at parse time, not at apply time

pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use provider::{ConfigProvider, ConfigStore, FileConfigStore, SnapshotStore};
pub use schema::{
    CacheConfig, FrontingConfig, KeyStrategyKind, ObservabilityConfig, ProxyConfig, RuleKind,
    ServerConfig, Settings, TransformRule,
};
