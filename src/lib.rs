//! Read-only data proxy for AROI artifacts.
//!
//! Resolves manifest and archive requests against an ordered set of object
//! storage backends, behind an edge cache, and hands everything else to a
//! static asset host.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod storage;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::Resolver;
