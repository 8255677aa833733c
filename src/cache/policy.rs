//! Cache lifetime resolution by content class.
//!
//! ```text
//! latest.json | files.json  → ttl_latest override     | 60s
//! immutable class           → ttl_historical override | 1 year, + immutable
//! anything else             → 300s
//! ```

use crate::config::CacheConfig;
use crate::routing::{is_immutable_class, RequestPath};

pub const DEFAULT_LATEST_TTL_SECS: u64 = 60;
pub const DEFAULT_HISTORICAL_TTL_SECS: u64 = 31_536_000;
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Manifests that are rewritten in place and must stay fresh.
const LATEST_MANIFESTS: [&str; 2] = ["latest.json", "files.json"];

/// Operator TTL overrides. Only strictly positive values are ever stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlOverrides {
    pub latest: Option<u64>,
    pub historical: Option<u64>,
}

impl TtlOverrides {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            latest: config.ttl_latest.as_ref().and_then(|t| t.seconds()),
            historical: config.ttl_historical.as_ref().and_then(|t| t.seconds()),
        }
    }
}

/// Cache lifetime in seconds for `path`.
pub fn resolve_ttl(path: &str, overrides: &TtlOverrides) -> u64 {
    if LATEST_MANIFESTS.contains(&path) {
        return positive_or(overrides.latest, DEFAULT_LATEST_TTL_SECS);
    }
    if is_immutable_class(path) {
        return positive_or(overrides.historical, DEFAULT_HISTORICAL_TTL_SECS);
    }
    DEFAULT_TTL_SECS
}

fn positive_or(value: Option<u64>, default: u64) -> u64 {
    value.filter(|v| *v > 0).unwrap_or(default)
}

/// How long a response may be reused, and whether it may be reused without
/// revalidation forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl_secs: u64,
    pub immutable: bool,
}

impl CachePolicy {
    pub fn for_path(path: &RequestPath, overrides: &TtlOverrides) -> Self {
        Self {
            ttl_secs: resolve_ttl(path.as_str(), overrides),
            immutable: is_immutable_class(path.as_str()),
        }
    }

    /// `Cache-Control` value, also mirrored into `CDN-Cache-Control`.
    pub fn cache_control(&self) -> String {
        if self.immutable {
            format!("public, max-age={}, immutable", self.ttl_secs)
        } else {
            format!("public, max-age={}", self.ttl_secs)
        }
    }
}

/// Extract `max-age` from a `Cache-Control` value.
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse().ok())
}
