//! Cache eligibility.
//!
//! Allow-most: error statuses, explicit `no-cache`/`no-store`, and JSON
//! bodies are never cached. Everything else is.

use crate::proxy::types::ProxyResponse;
use crate::rules::engine::media_type;

pub fn is_cacheable(response: &ProxyResponse) -> bool {
    if response.status >= 400 {
        return false;
    }

    if let Some(cache_control) = response.headers.get("cache-control") {
        let directives = cache_control.to_ascii_lowercase();
        if directives.contains("no-cache") || directives.contains("no-store") {
            return false;
        }
    }

    media_type(&response.content_type) != "application/json"
}
