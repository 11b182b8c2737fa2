//! Server-side processing of one forwarded request.
//!
//! Resolve config → rewrite → (server cache read) → fetch → transform →
//! server cache write. Stages run strictly in order; only the fetch waits on
//! the network. The server tier is keyed by URL alone, so only `GET` and
//! `HEAD` read from or write to it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::cache::ServerCache;
use crate::config::ConfigProvider;
use crate::error::{ProxyError, ProxyResult};
use crate::observability::metrics;
use crate::observability::{record_activity, ActivityLevel, ActivitySink, TracingActivitySink};
use crate::pipeline::Rewriter;
use crate::proxy::types::{ProxyRequest, ProxyResponse};
use crate::rules::RuleEngine;
use crate::transform::transform;
use crate::upstream::{FetchRequest, OriginFetcher};

/// The rewrite/fetch/transform/cache chain.
#[derive(Clone)]
pub struct ProxyService {
    config: Arc<ConfigProvider>,
    rewriter: Rewriter,
    fetcher: Arc<dyn OriginFetcher>,
    cache: ServerCache,
    activity: Arc<dyn ActivitySink>,
}

impl ProxyService {
    /// Service with a thread-random rewriter, in-memory timestamped server
    /// cache, and tracing activity sink.
    pub fn new(config: Arc<ConfigProvider>, fetcher: Arc<dyn OriginFetcher>) -> Self {
        Self {
            config,
            rewriter: Rewriter::default(),
            fetcher,
            cache: ServerCache::in_memory(),
            activity: Arc::new(TracingActivitySink),
        }
    }

    pub fn with_cache(mut self, cache: ServerCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivitySink>) -> Self {
        self.activity = activity;
        self
    }

    pub fn cache(&self) -> &ServerCache {
        &self.cache
    }

    pub fn config(&self) -> &ConfigProvider {
        &self.config
    }

    /// Run the full chain for `request`.
    pub async fn process(&self, request: ProxyRequest) -> ProxyResult<ProxyResponse> {
        let start = Instant::now();
        let method = request.method.clone();
        let url = request.url.clone();

        let result = self.run(request).await;

        match &result {
            Ok(response) => {
                metrics::record_request(&method, response.status, "ok", start);
                record_activity(
                    self.activity.as_ref(),
                    ActivityLevel::Info,
                    "Request proxied",
                    json!({
                        "url": url,
                        "method": method,
                        "status": response.status,
                        "cacheable": response.cacheable,
                        "elapsed_ms": start.elapsed().as_millis() as u64,
                    }),
                );
            }
            Err(e) => {
                metrics::record_request(&method, e.status(), e.code().as_str(), start);
                let level = if e.status() >= 500 {
                    ActivityLevel::Error
                } else {
                    ActivityLevel::Warn
                };
                record_activity(
                    self.activity.as_ref(),
                    level,
                    "Request failed",
                    json!({
                        "url": url,
                        "method": method,
                        "code": e.code(),
                        "error": e.to_string(),
                    }),
                );
            }
        }

        result
    }

    async fn run(&self, request: ProxyRequest) -> ProxyResult<ProxyResponse> {
        let config = self.config.resolve();
        if !config.enabled {
            return Err(ProxyError::ServiceDisabled);
        }
        if request.url.trim().is_empty() {
            return Err(ProxyError::InvalidInput("missing url".to_string()));
        }

        let engine = RuleEngine::compile(&config);
        for failure in engine.failures() {
            record_activity(
                self.activity.as_ref(),
                ActivityLevel::Warn,
                "Transform rule skipped",
                json!({ "index": failure.index, "pattern": failure.pattern, "error": failure.message }),
            );
        }

        let rewrite = self.rewriter.rewrite(&request, &config, &engine)?;
        let safe = is_safe_method(&request.method);

        if safe {
            match self.cache.lookup(&request.url).await {
                Ok(Some(hit)) => {
                    tracing::debug!(url = %request.url, "Server cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Server cache read failed"),
            }
        }

        tracing::debug!(
            url = %request.url,
            target = %rewrite.url,
            fronted = rewrite.fronted,
            "Fetching origin"
        );

        let raw = self
            .fetcher
            .fetch(FetchRequest {
                url: rewrite.url,
                method: request.method.clone(),
                headers: rewrite.headers,
                body: request.body.clone(),
                timeout: Duration::from_secs(config.fetch_timeout_secs),
                max_bytes: config.max_content_bytes,
            })
            .await?;

        let response = transform(raw, &engine);

        if safe && response.cacheable {
            if let Err(e) = self
                .cache
                .write(&request.url, &response, config.cache_ttl_secs)
                .await
            {
                tracing::warn!(url = %request.url, error = %e, "Server cache write failed");
            }
        }

        Ok(response)
    }
}

fn is_safe_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}
