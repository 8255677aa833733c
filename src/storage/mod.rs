//! Storage backend subsystem.
//!
//! # Data Flow
//! ```text
//! STORAGE_ORDER ("do,r2")
//!     → StorageOrder (parsed once per config load, unknown ids dropped)
//!
//! Per request, for each BackendKind in order:
//!     → BackendSet::get (None when the backend is not configured)
//!     → Fetcher::fetch(path)
//!         - spaces.rs: GET <base>/<path> over HTTP
//!         - bucket.rs: get-by-key on an object bucket
//!     → FetchOutcome::Found(stream) | FetchOutcome::Absent
//! ```
//!
//! # Design Decisions
//! - Fetchers never return errors; every failure is absence
//! - Bodies are streams, never buffered here
//! - A missing backend is skipped, not an error

pub mod bucket;
pub mod spaces;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::routing::RequestPath;

pub use bucket::{Bucket, BucketBackend, FilesystemBucket};
pub use spaces::SpacesBackend;

/// A boxed stream of object bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// The closed set of backends this proxy knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Generic HTTP object host (DigitalOcean Spaces).
    Spaces,
    /// Bucket get-by-key store (Cloudflare R2).
    Bucket,
}

impl BackendKind {
    /// Identifier used in `STORAGE_ORDER`.
    pub fn identifier(&self) -> &'static str {
        match self {
            BackendKind::Spaces => "do",
            BackendKind::Bucket => "r2",
        }
    }

    /// Provenance label sent in `X-Served-From`.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Spaces => "digitalocean-spaces",
            BackendKind::Bucket => "cloudflare-r2",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// One identifier from `STORAGE_ORDER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendId {
    Known(BackendKind),
    Unknown(String),
}

impl BackendId {
    pub fn parse(identifier: &str) -> Self {
        match identifier.trim() {
            "do" => BackendId::Known(BackendKind::Spaces),
            "r2" => BackendId::Known(BackendKind::Bucket),
            other => BackendId::Unknown(other.to_string()),
        }
    }
}

/// The order in which backends are tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOrder(Vec<BackendKind>);

impl StorageOrder {
    /// Parse a comma-separated identifier list. Unknown identifiers are
    /// dropped and repeated ones keep their first position.
    pub fn parse(order: &str) -> Self {
        let mut kinds = Vec::new();
        for raw in order.split(',') {
            match BackendId::parse(raw) {
                BackendId::Known(kind) if !kinds.contains(&kind) => kinds.push(kind),
                BackendId::Known(_) => {}
                BackendId::Unknown(id) if id.is_empty() => {}
                BackendId::Unknown(id) => {
                    tracing::warn!(identifier = %id, "Ignoring unknown storage backend identifier");
                }
            }
        }
        Self(kinds)
    }

    pub fn kinds(&self) -> &[BackendKind] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StorageOrder {
    fn default() -> Self {
        Self(vec![BackendKind::Spaces, BackendKind::Bucket])
    }
}

/// An object a backend produced.
pub struct FetchedObject {
    pub source: BackendKind,
    pub body: ByteStream,
}

impl fmt::Debug for FetchedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedObject")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Result of asking one backend for one path.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(FetchedObject),
    Absent,
}

/// Errors inside a backend. They never leave the fetcher that saw them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key does not name an object")]
    NotAnObject,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend answered with status {0}")]
    Status(u16),
}

/// Retrieval strategy for one named backend.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn fetch(&self, path: &RequestPath) -> FetchOutcome;
}

/// The configured backends, at most one per kind.
#[derive(Clone, Default)]
pub struct BackendSet {
    spaces: Option<Arc<dyn Fetcher>>,
    bucket: Option<Arc<dyn Fetcher>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the fetcher for its kind.
    pub fn with(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        match fetcher.kind() {
            BackendKind::Spaces => self.spaces = Some(fetcher),
            BackendKind::Bucket => self.bucket = Some(fetcher),
        }
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn Fetcher>> {
        match kind {
            BackendKind::Spaces => self.spaces.as_ref(),
            BackendKind::Bucket => self.bucket.as_ref(),
        }
    }

    /// Build the backends that have the configuration they need.
    pub fn from_config(config: &StorageConfig, io_timeout: Duration) -> Self {
        let mut set = Self::new();

        match config.spaces_url.as_deref() {
            Some(base) => match SpacesBackend::new(base, io_timeout) {
                Ok(backend) => set = set.with(Arc::new(backend)),
                Err(e) => tracing::error!(error = %e, "Spaces backend disabled"),
            },
            None => tracing::info!("DO_SPACES_URL not set, spaces backend disabled"),
        }

        match &config.bucket_path {
            Some(root) => {
                if !root.is_dir() {
                    tracing::warn!(root = ?root, "Bucket root is not a directory; every lookup will miss");
                }
                let bucket = FilesystemBucket::new(root);
                set = set.with(Arc::new(BucketBackend::new(Arc::new(bucket))));
            }
            None => tracing::info!("AROI_BUCKET not set, bucket backend disabled"),
        }

        set
    }
}

impl fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSet")
            .field("spaces", &self.spaces.is_some())
            .field("bucket", &self.bucket.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parsing() {
        assert_eq!(StorageOrder::parse("do,r2"), StorageOrder::default());
        assert_eq!(
            StorageOrder::parse(" r2 , do ").kinds(),
            &[BackendKind::Bucket, BackendKind::Spaces]
        );
        assert_eq!(StorageOrder::parse("r2").kinds(), &[BackendKind::Bucket]);
    }

    #[test]
    fn test_order_drops_unknown_and_duplicates() {
        assert_eq!(
            StorageOrder::parse("s3,do,,do,gcs,r2").kinds(),
            &[BackendKind::Spaces, BackendKind::Bucket]
        );
        assert!(StorageOrder::parse("s3,gcs").is_empty());
        assert!(StorageOrder::parse("").is_empty());
        assert!(StorageOrder::parse("DO").is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(BackendKind::Spaces.label(), "digitalocean-spaces");
        assert_eq!(BackendKind::Bucket.label(), "cloudflare-r2");
    }

    #[test]
    fn test_backend_set_from_empty_config() {
        let config = StorageConfig::default();
        let set = BackendSet::from_config(&config, Duration::from_secs(1));
        assert!(set.get(BackendKind::Spaces).is_none());
        assert!(set.get(BackendKind::Bucket).is_none());
    }
}
