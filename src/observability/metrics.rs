//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome (hit, miss, not_found, passthrough)
//! - `proxy_request_duration_seconds` (histogram): time to response headers, by outcome
//! - `proxy_backend_fetch_total` (counter): backend attempts by backend and result
//! - `proxy_cache_store_total` (counter): detached cache stores by result
//! - `proxy_cache_entries` (gauge): entries held by the in-memory edge cache
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are closed sets; never a path or a key

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// How a proxied request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    NotFound,
    Passthrough,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::NotFound => "not_found",
            Outcome::Passthrough => "passthrough",
        }
    }
}

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("proxy_requests_total", "Requests handled, by outcome.");
    metrics::describe_histogram!(
        "proxy_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time until response headers, by outcome."
    );
    metrics::describe_counter!("proxy_backend_fetch_total", "Backend fetch attempts, by backend and result.");
    metrics::describe_counter!("proxy_cache_store_total", "Edge cache stores, by result.");
    metrics::describe_gauge!("proxy_cache_entries", "Entries in the in-memory edge cache.");
}

pub fn record_request(outcome: Outcome, start: Instant) {
    metrics::counter!("proxy_requests_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// `result` is one of `found`, `absent`, `timeout`.
pub fn record_backend_fetch(backend: &'static str, result: &'static str) {
    metrics::counter!("proxy_backend_fetch_total", "backend" => backend, "result" => result).increment(1);
}

/// `result` is one of `stored`, `skipped`, `failed`.
pub fn record_cache_store(result: &'static str) {
    metrics::counter!("proxy_cache_store_total", "result" => result).increment(1);
}

pub fn record_cache_entries(entries: usize) {
    metrics::gauge!("proxy_cache_entries").set(entries as f64);
}
