//! HTTP surface of the proxy server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, middleware)
//!     → request.rs (x-request-id set and propagated)
//!     → POST /proxy (JSON) | GET /proxy?url=
//!         → ProxyService::process
//!     → response.rs (200 + envelope | status + error body)
//!
//! {management_prefix}/health, {management_prefix}/cache
//!     → status JSON
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
