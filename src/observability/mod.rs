//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http::server  → "request" span carrying request_id
//! proxy         → backend / cache_status / ttl_secs fields on log events
//!               → metrics.rs (requests by outcome, backend fetches, cache stores)
//! cache::memory → metrics.rs (entry gauge)
//!
//! logging.rs → stdout, filtered by RUST_LOG or observability.log_level
//! metrics.rs → Prometheus scrape endpoint when observability.metrics_enabled
//! ```
//!
//! # Design Decisions
//! - Metric labels come from closed sets, never from request data
//! - A path rejected by the sanitizer is never logged

pub mod logging;
pub mod metrics;
