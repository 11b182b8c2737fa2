//! Configuration validation.
//!
//! Serde handles the syntax (including unknown rule kinds); this module
//! checks value ranges and cross-field consistency. All errors are collected
//! rather than stopping at the first.
//!
//! Rule patterns are not compiled here. A bad pattern only disables that
//! rule, which the rule engine reports when it compiles the rule set.

use thiserror::Error;

use crate::config::schema::{ProxyConfig, Settings};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("fronting is enabled but front_host is empty")]
    MissingFrontHost,

    #[error("fronting parameter name must not be empty")]
    EmptyFrontingParam,

    #[error("{field} contains an empty entry")]
    EmptyDomain { field: &'static str },

    #[error("management_prefix must start with '/': {0}")]
    BadManagementPrefix(String),

    #[error("request_timeout_secs ({request}) must exceed fetch_timeout_secs ({fetch})")]
    TimeoutOrder { request: u64, fetch: u64 },
}

/// Validate a full settings file.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = proxy_errors(&settings.proxy);

    if !settings.server.management_prefix.starts_with('/') {
        errors.push(ValidationError::BadManagementPrefix(
            settings.server.management_prefix.clone(),
        ));
    }
    if settings.server.request_timeout_secs <= settings.proxy.fetch_timeout_secs {
        errors.push(ValidationError::TimeoutOrder {
            request: settings.server.request_timeout_secs,
            fetch: settings.proxy.fetch_timeout_secs,
        });
    }
    if settings.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "cache.sweep_interval_secs" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the per-request rewrite section.
pub fn validate_proxy(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let errors = proxy_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn proxy_errors(config: &ProxyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.max_content_bytes == 0 {
        errors.push(ValidationError::Zero { field: "proxy.max_content_bytes" });
    }
    if config.fetch_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "proxy.fetch_timeout_secs" });
    }
    if config.allowed_domains.iter().any(|d| d.trim().is_empty()) {
        errors.push(ValidationError::EmptyDomain { field: "proxy.allowed_domains" });
    }
    if config.blocked_domains.iter().any(|d| d.trim().is_empty()) {
        errors.push(ValidationError::EmptyDomain { field: "proxy.blocked_domains" });
    }
    if config.fronting.enabled {
        if config.fronting.front_host.trim().is_empty() {
            errors.push(ValidationError::MissingFrontHost);
        }
        if config.fronting.param.is_empty() {
            errors.push(ValidationError::EmptyFrontingParam);
        }
    }

    errors
}
