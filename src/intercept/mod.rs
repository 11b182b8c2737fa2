//! Client-side interception.
//!
//! # Data Flow
//! ```text
//! outbound request
//!     → decision.rs (exempt? static asset, control host, management path)
//!     → forwarder.rs (remote proxy server | in-process service)
//!     → interceptor.rs
//!         ok  → client cache write → response
//!         err → client cache read  → cached response | 503 placeholder
//! ```

pub mod decision;
pub mod forwarder;
pub mod interceptor;

pub use decision::{Decision, ExemptReason, InterceptPolicy};
pub use forwarder::{ForwardError, Forwarder, LocalForwarder, RemoteForwarder};
pub use interceptor::{InterceptState, Interceptor, Outcome};
