//! Client-tier cache.
//!
//! Lives next to the interception layer. Every fresh cacheable response is
//! stored under the original request identity; the store is only read when
//! forwarding fails.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::CacheError;
use crate::observability::metrics;
use crate::proxy::types::{ProxyRequest, ProxyResponse};

#[async_trait]
pub trait ClientCacheStore: Send + Sync {
    async fn put(&self, identity: &str, response: &ProxyResponse) -> Result<(), CacheError>;

    async fn match_request(&self, identity: &str) -> Result<Option<ProxyResponse>, CacheError>;
}

/// Concurrent map with optional JSON file persistence.
#[derive(Clone, Default)]
pub struct MemoryClientStore {
    inner: Arc<DashMap<String, ProxyResponse>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryClientStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists; later saves go to the same file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, ProxyResponse> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                store.inner.insert(k, v);
            }
            tracing::info!("Loaded {} client cache entries from {}", store.inner.len(), path.display());
        }
        Ok(store)
    }

    /// Save to the persistence file, if one was configured.
    pub fn save_to_file(&self) -> Result<(), CacheError> {
        if let Some(path) = &self.persistence_path {
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, &map)?;
            tracing::debug!("Saved {} client cache entries", map.len());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ClientCacheStore for MemoryClientStore {
    async fn put(&self, identity: &str, response: &ProxyResponse) -> Result<(), CacheError> {
        self.inner.insert(identity.to_string(), response.clone());
        Ok(())
    }

    async fn match_request(&self, identity: &str) -> Result<Option<ProxyResponse>, CacheError> {
        Ok(self.inner.get(identity).map(|r| r.value().clone()))
    }
}

/// Client-tier front end used by the interception layer.
#[derive(Clone)]
pub struct ClientCache {
    store: Arc<dyn ClientCacheStore>,
}

impl ClientCache {
    pub fn new(store: Arc<dyn ClientCacheStore>) -> Self {
        Self { store }
    }

    /// Overwrite the entry for `request` when `response` is cacheable.
    pub async fn remember(&self, request: &ProxyRequest, response: &ProxyResponse) {
        if !response.cacheable {
            return;
        }
        match self.store.put(&request.identity(), response).await {
            Ok(()) => metrics::record_cache_event("client", "write"),
            Err(e) => tracing::warn!(error = %e, "Client cache write failed"),
        }
    }

    /// Previously cached response for `request`, if any.
    pub async fn lookup(&self, request: &ProxyRequest) -> Option<ProxyResponse> {
        match self.store.match_request(&request.identity()).await {
            Ok(Some(hit)) => {
                metrics::record_cache_event("client", "hit");
                tracing::info!(url = %request.url, "Serving client cache fallback");
                Some(hit)
            }
            Ok(None) => {
                metrics::record_cache_event("client", "miss");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Client cache read failed");
                None
            }
        }
    }

    /// Previously cached response for `request`, or the 503 placeholder.
    pub async fn fallback(&self, request: &ProxyRequest) -> ProxyResponse {
        self.lookup(request).await.unwrap_or_else(ProxyResponse::unavailable)
    }
}
