//! Request path routing subsystem.
//!
//! # Data Flow
//! ```text
//! Raw request path (string or pre-split segments)
//!     → sanitize.rs (normalize, reject traversal / NUL)
//!     → RequestPath (canonical, no leading slash; empty = rejected)
//!     → classify.rs (proxy-eligible? immutable class?)
//!     → ProxyDecision
//! ```
//!
//! # Design Decisions
//! - Validation runs on the raw, still percent-encoded path
//! - Rejection collapses to the empty path, never to an error value
//! - Classification uses exact literal prefixes and suffixes, no regex

pub mod classify;
pub mod sanitize;

pub use classify::{is_immutable_class, is_proxy_eligible, ProxyDecision};
pub use sanitize::{sanitize, RawPath, RequestPath};
