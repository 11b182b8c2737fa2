//! Rewrite pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest
//!     → rewrite.rs (parse URL, domain policy, URL rules)
//!     → fronting.rs (sensitive host substitution, optional)
//!     → rules::headers (sanitize, inject)
//!     → RewriteResult { url, headers } | RejectReason
//! ```
//!
//! # Design Decisions
//! - Every rejection happens before any network call
//! - Output is deterministic apart from the injected random header values

pub mod fronting;
pub mod rewrite;

pub use rewrite::{parse_target, RewriteResult, Rewriter};

use thiserror::Error;

/// Why the pipeline refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("invalid or unsupported URL")]
    InvalidUrl,

    #[error("domain is blocked")]
    DomainBlocked,

    #[error("domain is not on the allow-list")]
    DomainNotAllowed,
}
