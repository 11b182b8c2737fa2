//! Server-tier key construction.
//!
//! The default [`TimestampedKey`] appends the write time to the URL, so every
//! cacheable response adds a new entry and nothing can be looked up by URL
//! alone. Storage grows with traffic until entries expire. [`UrlKey`]
//! collapses writes to one entry per URL and makes lookups possible.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::KeyStrategyKind;

pub trait CacheKeyStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Key for an entry written at `written_at`.
    fn write_key(&self, url: &str, written_at: SystemTime) -> String;

    /// Key to read `url` back with, if the strategy supports reads.
    fn read_key(&self, url: &str) -> Option<String>;
}

/// `<url>#<unix millis>`. Write-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampedKey;

impl CacheKeyStrategy for TimestampedKey {
    fn name(&self) -> &'static str {
        "timestamped"
    }

    fn write_key(&self, url: &str, written_at: SystemTime) -> String {
        let millis = written_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("{url}#{millis}")
    }

    fn read_key(&self, _url: &str) -> Option<String> {
        None
    }
}

/// The URL itself. Later writes replace earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlKey;

impl CacheKeyStrategy for UrlKey {
    fn name(&self) -> &'static str {
        "url"
    }

    fn write_key(&self, url: &str, _written_at: SystemTime) -> String {
        url.to_string()
    }

    fn read_key(&self, url: &str) -> Option<String> {
        Some(url.to_string())
    }
}

pub fn strategy_for(kind: KeyStrategyKind) -> Arc<dyn CacheKeyStrategy> {
    match kind {
        KeyStrategyKind::Timestamped => Arc::new(TimestampedKey),
        KeyStrategyKind::Url => Arc::new(UrlKey),
    }
}
