//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listener stops accepting → in-flight responses finish
//!
//! Deferred work (tasks.rs):
//!     cache stores detached from responses
//!     → drained (bounded by grace period) before exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, finish responses, drain deferred work
//! - Draining has a deadline: pending stores are abandoned after it

pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use tasks::DeferredTasks;
