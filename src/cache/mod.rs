//! Edge cache subsystem.
//!
//! # Data Flow
//! ```text
//! RequestPath + origin
//!     → edge.rs (CacheKey, EdgeCache lookup)
//!     → hit: stored CachedResponse replayed
//!     → miss: policy.rs (TTL by content class)
//!            → backend response synthesized with that TTL
//!            → edge.rs store (detached, best effort)
//! ```
//!
//! # Design Decisions
//! - The cache is an injected trait object; the bundled store is in memory
//! - A stored copy's lifetime comes from its own Cache-Control header
//! - Cache failures never reach the client

pub mod clock;
pub mod edge;
pub mod memory;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use edge::{CacheError, CacheKey, CachedResponse, EdgeCache};
pub use memory::MemoryEdgeCache;
pub use policy::{resolve_ttl, CachePolicy, TtlOverrides};
