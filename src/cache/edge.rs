//! Edge cache contract.
//!
//! The edge cache is an external store keyed by URL. The resolver only ever
//! asks it two things: is there a copy for this key, and keep this copy.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

use crate::routing::RequestPath;

/// Cache key: canonical URL of the object, `<origin>/<canonical path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(origin: &str, path: &RequestPath) -> Self {
        Self(format!("{}/{}", origin.trim_end_matches('/'), path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully buffered response as kept by the edge cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Rebuild a client response from the stored copy.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// Errors reported by an edge cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No room for another entry.
    #[error("cache is full ({0} entries)")]
    Full(usize),

    /// The response carries no usable lifetime.
    #[error("response has no positive max-age")]
    Uncacheable,

    /// The cache service could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EdgeCache: Send + Sync {
    /// Look up a live copy for `key`.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError>;

    /// Keep `response` under `key` for as long as its `Cache-Control` allows.
    async fn store(&self, key: CacheKey, response: CachedResponse) -> Result<(), CacheError>;
}
