//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: request_id, url, status)
//!     → metrics.rs (counters, gauges, histograms)
//!     → activity.rs (pipeline outcomes for the activity sink)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, text or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Activity logging never fails a request

pub mod activity;
pub mod logging;
pub mod metrics;

pub use activity::{
    record_activity, ActivityEvent, ActivityLevel, ActivitySink, MemoryActivitySink, TracingActivitySink,
};
