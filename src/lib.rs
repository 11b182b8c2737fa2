//! Rewriting forward proxy library.
//!
//! Takes a target URL plus request metadata, rewrites it under the active
//! configuration, fetches the origin, applies content rules, and caches the
//! result at two tiers. The interception layer sits in front and falls back
//! to the client-tier cache when forwarding fails.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod intercept;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod proxy;
pub mod rules;
pub mod transform;
pub mod upstream;

pub use config::schema::{ProxyConfig, Settings};
pub use error::{ErrorBody, ErrorCode, ProxyError, ProxyResult};
pub use http::HttpServer;
pub use intercept::Interceptor;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyRequest, ProxyResponse, ProxyService};
