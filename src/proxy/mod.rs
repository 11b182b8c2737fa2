//! Proxy core.
//!
//! # Data Flow
//! ```text
//! ProxyRequest
//!     → service.rs
//!         → config provider (snapshot for this cycle)
//!         → pipeline (rewrite)
//!         → upstream (fetch)
//!         → transform (content rules, cacheability)
//!         → cache (server tier)
//!     → ProxyResponse | ProxyError
//! ```

pub mod service;
pub mod types;

pub use service::ProxyService;
pub use types::{Content, Headers, ProxyRequest, ProxyResponse, UNAVAILABLE_BODY};
