//! Rule engine subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig snapshot
//!     → engine.rs (compile URL / header / content rules, skip bad patterns)
//!     → domain.rs (allow/block host fragments)
//!
//! Used by:
//!     → pipeline (URL rules, domain checks, header policy)
//!     → transform (content rules)
//! ```
//!
//! # Design Decisions
//! - Evaluation is pure: same snapshot and input, same output
//! - Rules of one kind run in list order, each on the previous output
//! - Header randomness comes from an injected `RandomSource`

pub mod domain;
pub mod engine;
pub mod headers;
pub mod random;

pub use domain::{DomainPolicy, DomainVerdict};
pub use engine::{RuleEngine, RuleError};
pub use headers::apply_header_policy;
pub use random::{RandomSource, SeededRandom, ThreadRandom};
