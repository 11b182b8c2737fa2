//! Origin fetch subsystem.
//!
//! # Data Flow
//! ```text
//! RewriteResult
//!     → fetcher.rs (send with deadline, bounded body, strip hop-by-hop)
//!     → RawResponse
//!     → body.rs (Text | Binary by content type)
//! ```

pub mod body;
pub mod fetcher;

pub use fetcher::{FetchError, FetchRequest, HttpFetcher, OriginFetcher, RawResponse};
