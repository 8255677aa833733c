//! Bucket-style object backend.
//!
//! A bucket answers get-by-key. "Not found" and store-level errors both end
//! up as absence at the fetcher boundary.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::routing::RequestPath;
use crate::storage::{BackendKind, ByteStream, FetchOutcome, FetchedObject, Fetcher, StorageError};

/// Get-by-key object store.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Stream the object stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<ByteStream>, StorageError>;
}

/// A bucket backed by a local directory: key `a/b.json` is the file
/// `<root>/a/b.json`.
#[derive(Debug, Clone)]
pub struct FilesystemBucket {
    root: PathBuf,
}

impl FilesystemBucket {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Bucket for FilesystemBucket {
    async fn get(&self, key: &str) -> Result<Option<ByteStream>, StorageError> {
        // Keys come from the sanitizer: relative, no `.`/`..` segments.
        let path = self.root.join(key);

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        if !file.metadata().await?.is_file() {
            return Err(StorageError::NotAnObject);
        }

        Ok(Some(Box::pin(ReaderStream::new(file))))
    }
}

/// Fetcher over any [`Bucket`].
pub struct BucketBackend {
    bucket: Arc<dyn Bucket>,
}

impl BucketBackend {
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Self { bucket }
    }
}

#[async_trait]
impl Fetcher for BucketBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bucket
    }

    async fn fetch(&self, path: &RequestPath) -> FetchOutcome {
        match self.bucket.get(path.as_str()).await {
            Ok(Some(body)) => FetchOutcome::Found(FetchedObject {
                source: BackendKind::Bucket,
                body,
            }),
            Ok(None) => {
                tracing::debug!(backend = "r2", path = %path, "Object not found");
                FetchOutcome::Absent
            }
            Err(e) => {
                tracing::warn!(backend = "r2", path = %path, error = %e, "Bucket fetch failed");
                FetchOutcome::Absent
            }
        }
    }
}
