//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the data proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Storage backends and their try order.
    pub storage: StorageConfig,

    /// Edge cache and cache lifetime settings.
    pub cache: CacheConfig,

    /// Where non-proxied requests are sent.
    pub assets: AssetConfig,

    /// Extra response headers.
    pub headers: HeaderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (time until response headers) in seconds.
    pub request_secs: u64,

    /// Deadline for a single backend to produce an object, in seconds.
    pub backend_fetch_secs: u64,

    /// How long shutdown waits for pending cache stores, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            backend_fetch_secs: 5,
            shutdown_grace_secs: 10,
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the generic HTTP backend (`DO_SPACES_URL`).
    /// Absent disables that backend.
    pub spaces_url: Option<String>,

    /// Root directory of the bucket backend (`AROI_BUCKET`).
    /// Absent disables that backend.
    pub bucket_path: Option<PathBuf>,

    /// Comma-separated backend identifiers in try order (`STORAGE_ORDER`).
    pub order: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            spaces_url: None,
            bucket_path: None,
            order: "do,r2".to_string(),
        }
    }
}

/// A TTL override as written in config: an integer, or a string from the
/// environment. Anything that is not a positive integer is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TtlSetting {
    Seconds(i64),
    Text(String),
}

impl TtlSetting {
    /// The override in seconds, if it is a strictly positive integer.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            TtlSetting::Seconds(secs) => u64::try_from(*secs).ok().filter(|s| *s > 0),
            TtlSetting::Text(text) => text.trim().parse::<u64>().ok().filter(|s| *s > 0),
        }
    }
}

/// Edge cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL override for `latest.json` / `files.json` (`CACHE_TTL_LATEST`).
    pub ttl_latest: Option<TtlSetting>,

    /// TTL override for immutable content (`CACHE_TTL_HISTORICAL`).
    pub ttl_historical: Option<TtlSetting>,

    /// Maximum number of cached responses.
    pub max_entries: usize,

    /// Bodies larger than this are streamed but not cached.
    pub max_entry_bytes: usize,

    /// Origin used in cache keys instead of the request's own.
    pub public_origin: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_latest: None,
            ttl_historical: None,
            max_entries: 10_000,
            max_entry_bytes: 64 * 1024 * 1024,
            public_origin: None,
        }
    }
}

/// Static asset host configuration. At most one of the two may be set;
/// with neither, non-proxied requests get a plain 404.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Upstream origin to forward non-proxied requests to.
    pub upstream: Option<String>,

    /// Local directory to serve non-proxied requests from.
    pub root: Option<PathBuf>,
}

/// Response header options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Value for `Access-Control-Allow-Origin` (`CORS_ALLOW_ORIGIN`).
    /// Unset means no CORS header.
    pub cors_allow_origin: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_setting_only_accepts_positive_integers() {
        assert_eq!(TtlSetting::Seconds(120).seconds(), Some(120));
        assert_eq!(TtlSetting::Text(" 120 ".into()).seconds(), Some(120));

        assert_eq!(TtlSetting::Seconds(0).seconds(), None);
        assert_eq!(TtlSetting::Seconds(-5).seconds(), None);
        assert_eq!(TtlSetting::Text("0".into()).seconds(), None);
        assert_eq!(TtlSetting::Text("-60".into()).seconds(), None);
        assert_eq!(TtlSetting::Text("soon".into()).seconds(), None);
        assert_eq!(TtlSetting::Text("".into()).seconds(), None);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [storage]
            spaces_url = "https://bucket.example.com/data/"
            order = "r2,do"

            [cache]
            ttl_latest = 30
            ttl_historical = "86400"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.order, "r2,do");
        assert_eq!(config.cache.ttl_latest, Some(TtlSetting::Seconds(30)));
        assert_eq!(config.cache.ttl_historical.as_ref().and_then(TtlSetting::seconds), Some(86400));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.backend_fetch_secs, 5);
    }
}
