//! Request resolution.
//!
//! # Data Flow
//! ```text
//! Request
//!     → routing::sanitize (raw path → RequestPath, empty if rejected)
//!     → routing::classify (eligible? immutable?)
//!     → not eligible, or not GET/HEAD: assets.rs (asset host, untouched)
//!     → eligible: resolver.rs
//!         → EdgeCache lookup (HIT → replay stored copy)
//!         → Fetcher per StorageOrder, each bounded by a deadline
//!         → first Found: response streamed, copy stored by a deferred task
//!         → none: generic 404
//! ```

pub mod assets;
pub mod resolver;

pub use assets::{AssetHost, NoAssetHost, StaticDirAssetHost, UpstreamAssetHost};
pub use resolver::{Resolver, ResolverSettings};
