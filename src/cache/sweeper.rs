//! Background removal of expired server-tier entries.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cache::server::MemoryCacheStore;

pub struct CacheSweeper {
    store: MemoryCacheStore,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(store: MemoryCacheStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweep on every tick until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Cache sweeper disabled");
            return;
        }

        tracing::info!(interval = ?self.interval, "Cache sweeper starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.store.len(), "Expired cache entries purged");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::server::{CacheEntry, CacheStore};
    use crate::proxy::{Content, Headers};

    fn expired(key: &str) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            content: Content::text("old"),
            content_type: "text/html".into(),
            status: 200,
            status_text: "OK".into(),
            headers: Headers::new(),
            expires_at: 1,
        }
    }

    #[tokio::test]
    async fn test_sweeps_then_stops() {
        let store = MemoryCacheStore::new();
        store.put("a", expired("a"), Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.len(), 1);

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(CacheSweeper::new(store.clone(), Duration::from_millis(10)).run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.is_empty());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
