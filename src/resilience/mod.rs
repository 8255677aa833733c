//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Backend fetch:
//!     → timeouts.rs (deadline per backend)
//!     → elapsed: backend counted as absent, next backend tried
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries: failover to the next backend replaces them

pub mod timeouts;

pub use timeouts::{bounded, DeadlineElapsed};
