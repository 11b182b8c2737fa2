//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! signals.rs: SIGINT / SIGTERM
//!     → shutdown.rs trigger
//!         → HTTP server stops accepting, drains
//!         → cache sweeper exits its loop
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
