//! Server-tier cache.
//!
//! Written on every cacheable success. Entries are inserted, never updated
//! in place; the store enforces expiry.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::key::{CacheKeyStrategy, TimestampedKey};
use crate::cache::{unix_secs, CacheError};
use crate::observability::metrics;
use crate::proxy::types::{Content, Headers, ProxyResponse};

/// One stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub content: Content,
    pub content_type: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: u64,
}

impl CacheEntry {
    pub fn from_response(key: String, response: &ProxyResponse, expires_at: u64) -> Self {
        Self {
            key,
            content: response.content.clone(),
            content_type: response.content_type.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.expires_at <= now_secs
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_secs(SystemTime::now()))
    }

    pub fn into_response(self) -> ProxyResponse {
        ProxyResponse {
            content: self.content,
            content_type: self.content_type,
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            cacheable: true,
        }
    }
}

/// Persistent store behind the server tier.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn put(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError>;

    /// The entry under `key`, unless absent or expired.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Number of stored entries, if the store can tell.
    fn entry_count(&self) -> Option<usize> {
        None
    }
}

/// In-process store on a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = unix_secs(SystemTime::now());
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All live keys. Used by the management endpoint and tests.
    pub fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn put(&self, key: &str, entry: CacheEntry, _ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), entry);
        metrics::record_cache_size(self.inner.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        // Checked under the shard lock so a concurrent fresh upsert survives.
        if self.inner.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            return Ok(None);
        }
        Ok(self
            .inner
            .get(key)
            .map(|r| r.value().clone())
            .filter(|entry| !entry.is_expired()))
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.inner.len())
    }
}

/// Server-tier front end: key strategy plus store.
#[derive(Clone)]
pub struct ServerCache {
    store: Arc<dyn CacheStore>,
    keys: Arc<dyn CacheKeyStrategy>,
}

impl ServerCache {
    pub fn new(store: Arc<dyn CacheStore>, keys: Arc<dyn CacheKeyStrategy>) -> Self {
        Self { store, keys }
    }

    /// Memory store with timestamped keys.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), Arc::new(TimestampedKey))
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn strategy(&self) -> &'static str {
        self.keys.name()
    }

    /// Insert `response` for `url`. Returns the key written.
    pub async fn write(
        &self,
        url: &str,
        response: &ProxyResponse,
        ttl_secs: u64,
    ) -> Result<String, CacheError> {
        let now = SystemTime::now();
        let key = self.keys.write_key(url, now);
        let expires_at = unix_secs(now).saturating_add(ttl_secs);
        let entry = CacheEntry::from_response(key.clone(), response, expires_at);

        self.store.put(&key, entry, Duration::from_secs(ttl_secs)).await?;
        metrics::record_cache_event("server", "write");
        tracing::debug!(key = %key, expires_at, "Server cache entry written");
        Ok(key)
    }

    /// Read `url` back, when the key strategy allows it.
    pub async fn lookup(&self, url: &str) -> Result<Option<ProxyResponse>, CacheError> {
        let Some(key) = self.keys.read_key(url) else {
            return Ok(None);
        };
        let hit = self.store.get(&key).await?;
        metrics::record_cache_event("server", if hit.is_some() { "hit" } else { "miss" });
        Ok(hit.map(CacheEntry::into_response))
    }
}
