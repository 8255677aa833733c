//! Proxy eligibility and content-class predicates.
//!
//! # Design Decisions
//! - Pure, total functions over the canonical path
//! - Immutability is decided by two literal prefixes only; a path that merely
//!   starts with the same letter is not immutable

use crate::routing::sanitize::RequestPath;

/// Prefix of the versioned archive tree.
pub const ARCHIVES_PREFIX: &str = "archives/";

/// Prefix of timestamped validation snapshots.
pub const VALIDATION_PREFIX: &str = "aroi_validation_";

const JSON_SUFFIX: &str = ".json";
const TARBALL_SUFFIX: &str = ".tar.gz";

/// Returns true if the path is resolved through the storage backends rather
/// than the static asset host.
pub fn is_proxy_eligible(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    path.ends_with(JSON_SUFFIX) || path.ends_with(TARBALL_SUFFIX) || path.starts_with(ARCHIVES_PREFIX)
}

/// Returns true if the path names content that never changes once published.
pub fn is_immutable_class(path: &str) -> bool {
    path.starts_with(VALIDATION_PREFIX) || path.starts_with(ARCHIVES_PREFIX)
}

/// Classification of one request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyDecision {
    pub eligible: bool,
    pub immutable: bool,
}

impl ProxyDecision {
    pub fn classify(path: &RequestPath) -> Self {
        Self {
            eligible: is_proxy_eligible(path.as_str()),
            immutable: is_immutable_class(path.as_str()),
        }
    }
}
