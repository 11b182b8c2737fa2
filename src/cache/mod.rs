//! Cache subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyResponse
//!     → policy.rs (is_cacheable)
//!     → server.rs (insert under key.rs strategy, expiry = now + ttl)
//!
//! Interception layer:
//!     success → client.rs remember(original identity)
//!     failure → client.rs fallback (hit | fixed 503)
//! ```
//!
//! # Design Decisions
//! - Server-tier entries are inserted, never updated in place
//! - The key strategy is swappable; the default accumulates one entry per write
//! - The client tier is only read on failure

pub mod client;
pub mod key;
pub mod policy;
pub mod server;
pub mod sweeper;

pub use client::{ClientCache, ClientCacheStore, MemoryClientStore};
pub use key::{strategy_for, CacheKeyStrategy, TimestampedKey, UrlKey};
pub use policy::is_cacheable;
pub use server::{CacheEntry, CacheStore, MemoryCacheStore, ServerCache};
pub use sweeper::CacheSweeper;

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Errors raised by cache stores.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(String),

    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Seconds since the Unix epoch.
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
