//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root of the configuration file.
///
/// `server`, `observability` and `cache` are read once at startup. The
/// `proxy` section is re-read through the [`ConfigProvider`] on every request
/// cycle.
///
/// [`ConfigProvider`]: crate::config::provider::ConfigProvider
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener and management surface.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Cache store settings.
    pub cache: CacheConfig,

    /// Per-request rewrite configuration.
    pub proxy: ProxyConfig,
}

/// Listener and management configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix of the management endpoints.
    pub management_prefix: String,

    /// Whole-request timeout for the HTTP server, in seconds. Must exceed
    /// the fetch timeout.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_request_body: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            management_prefix: "/__proxy".to_string(),
            request_timeout_secs: 45,
            max_request_body: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Key construction used by the server-tier cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategyKind {
    /// One entry per write, keyed by URL and write timestamp.
    #[default]
    Timestamped,
    /// One entry per URL, overwritten on every write.
    Url,
}

/// Server-tier cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub key_strategy: KeyStrategyKind,

    /// Interval of the expired-entry sweeper, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_strategy: KeyStrategyKind::Timestamped,
            sweep_interval_secs: 60,
        }
    }
}

/// Rewrite configuration snapshot consulted by every request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Master switch. A disabled proxy answers `SERVICE_DISABLED`.
    pub enabled: bool,

    /// Lifetime of server-tier cache entries.
    pub cache_ttl_secs: u64,

    /// Response body cap enforced while streaming from the origin.
    pub max_content_bytes: usize,

    /// Wall-clock limit on a single origin fetch.
    pub fetch_timeout_secs: u64,

    /// Allow-list of host fragments. Empty means every host is allowed.
    pub allowed_domains: Vec<String>,

    /// Block-list of host fragments. Always wins over the allow-list.
    pub blocked_domains: Vec<String>,

    /// Ordered transformation rules.
    pub transform_rules: Vec<TransformRule>,

    pub fronting: FrontingConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_ttl_secs: 3600,
            max_content_bytes: 10 * 1024 * 1024,
            fetch_timeout_secs: 30,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            transform_rules: Vec::new(),
            fronting: FrontingConfig::default(),
        }
    }
}

/// Which part of the exchange a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Url,
    Header,
    Content,
}

/// A single regex substitution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransformRule {
    /// Regular expression to search for.
    pub pattern: String,

    /// Replacement text; `$1`-style capture references are expanded.
    pub replacement: String,

    pub kind: RuleKind,

    /// Media type prefixes a content rule is limited to. Empty applies the
    /// rule to every text body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<String>,
}

impl TransformRule {
    pub fn new(kind: RuleKind, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            kind,
            content_types: Vec::new(),
        }
    }
}

/// Fronting substitution for sensitive hosts.
///
/// Swapping the visible host for `front_host` and carrying the real URL as a
/// query parameter is cosmetic obfuscation. It does not defeat inspection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontingConfig {
    pub enabled: bool,

    /// Host the rewritten request is addressed to.
    pub front_host: String,

    /// Host fragments that trigger fronting.
    pub sensitive_domains: Vec<String>,

    /// Query parameter carrying the original URL.
    pub param: String,
}

impl Default for FrontingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            front_host: String::new(),
            sensitive_domains: Vec::new(),
            param: "url".to_string(),
        }
    }
}
