//! Response synthesis.
//!
//! # Responsibilities
//! - Build the outbound response for an object a backend produced
//! - Content type, cache lifetime, provenance and security headers
//! - Mark cache status on the way out
//! - The generic not-found response
//!
//! # Design Decisions
//! - Bodies are passed through as streams, never buffered here
//! - The not-found response never carries request data

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::cache::CachePolicy;
use crate::config::HeaderConfig;
use crate::routing::RequestPath;
use crate::storage::BackendKind;

pub const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
pub const X_SERVED_FROM: HeaderName = HeaderName::from_static("x-served-from");
pub const X_IMMUTABLE: HeaderName = HeaderName::from_static("x-immutable");
pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

const JSON: HeaderValue = HeaderValue::from_static("application/json");
const OCTET_STREAM: HeaderValue = HeaderValue::from_static("application/octet-stream");
const NOT_FOUND_BODY: &str = "Not Found";

/// Whether the response came out of the edge cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn header_value(&self) -> HeaderValue {
        match self {
            CacheStatus::Hit => HeaderValue::from_static("HIT"),
            CacheStatus::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

/// Optional headers added to every object response.
///
/// Applied again when a cached entry is replayed, so a reload takes effect
/// on HITs too.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    pub cors_allow_origin: Option<HeaderValue>,
}

impl HeaderPolicy {
    pub fn from_config(config: &HeaderConfig) -> Self {
        let cors_allow_origin = config.cors_allow_origin.as_deref().and_then(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!("CORS_ALLOW_ORIGIN is not a valid header value, ignoring"))
                .ok()
        });
        Self { cors_allow_origin }
    }

    /// Bring `headers` in line with this policy, replacing whatever an
    /// earlier policy left there.
    pub fn apply(&self, headers: &mut HeaderMap) {
        match &self.cors_allow_origin {
            Some(origin) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            }
            None => {
                headers.remove(ACCESS_CONTROL_ALLOW_ORIGIN);
            }
        }
    }
}

pub fn content_type_for(path: &RequestPath) -> HeaderValue {
    if path.as_str().ends_with(".json") {
        JSON
    } else {
        OCTET_STREAM
    }
}

/// Headers for an object served from `source`.
pub fn object_headers(
    path: &RequestPath,
    source: BackendKind,
    policy: &CachePolicy,
    header_policy: &HeaderPolicy,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, content_type_for(path));

    // Built from digits and fixed ASCII only.
    let cache_control = HeaderValue::from_str(&policy.cache_control())
        .expect("cache-control is always a valid header value");
    headers.insert(CACHE_CONTROL, cache_control.clone());
    headers.insert(CDN_CACHE_CONTROL, cache_control);

    headers.insert(X_SERVED_FROM, HeaderValue::from_static(source.label()));
    headers.insert(
        X_IMMUTABLE,
        HeaderValue::from_static(if policy.immutable { "true" } else { "false" }),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    header_policy.apply(&mut headers);
    headers
}

/// Wrap `body` in a 200 response carrying the object headers.
pub fn synthesize(
    body: Body,
    path: &RequestPath,
    source: BackendKind,
    policy: &CachePolicy,
    header_policy: &HeaderPolicy,
) -> Response {
    with_headers(body, object_headers(path, source, policy, header_policy))
}

pub fn with_headers(body: Body, headers: HeaderMap) -> Response {
    let mut response = Response::new(body);
    *response.headers_mut() = headers;
    response
}

pub fn mark_cache_status(response: &mut Response, status: CacheStatus) {
    response.headers_mut().insert(X_CACHE_STATUS, status.header_value());
}

/// 404 with a fixed body. Never includes the requested path.
pub fn not_found() -> Response {
    let mut response = Response::new(Body::from(NOT_FOUND_BODY));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlOverrides;
    use crate::routing::sanitize;

    fn headers_for(path: &str, source: BackendKind, header_policy: &HeaderPolicy) -> HeaderMap {
        let path = sanitize(path);
        let policy = CachePolicy::for_path(&path, &TtlOverrides::default());
        object_headers(&path, source, &policy, header_policy)
    }

    #[test]
    fn test_json_manifest_headers() {
        let headers = headers_for("latest.json", BackendKind::Spaces, &HeaderPolicy::default());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers[CDN_CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers[X_SERVED_FROM], "digitalocean-spaces");
        assert_eq!(headers[X_IMMUTABLE], "false");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(X_CACHE_STATUS).is_none());
    }

    #[test]
    fn test_archive_headers() {
        let headers = headers_for("archives/2024/a.tar.gz", BackendKind::Bucket, &HeaderPolicy::default());
        assert_eq!(headers[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=31536000, immutable");
        assert_eq!(headers[CDN_CACHE_CONTROL], headers[CACHE_CONTROL]);
        assert_eq!(headers[X_SERVED_FROM], "cloudflare-r2");
        assert_eq!(headers[X_IMMUTABLE], "true");
    }

    #[test]
    fn test_cors_toggle() {
        let config = HeaderConfig {
            cors_allow_origin: Some("*".into()),
        };
        let headers = headers_for("latest.json", BackendKind::Spaces, &HeaderPolicy::from_config(&config));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let broken = HeaderConfig {
            cors_allow_origin: Some("bad\nvalue".into()),
        };
        assert!(HeaderPolicy::from_config(&broken).cors_allow_origin.is_none());
    }

    #[tokio::test]
    async fn test_not_found_is_generic() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Not Found");
    }

    #[test]
    fn test_mark_cache_status() {
        let mut response = not_found();
        mark_cache_status(&mut response, CacheStatus::Miss);
        assert_eq!(response.headers()[X_CACHE_STATUS], "MISS");
        mark_cache_status(&mut response, CacheStatus::Hit);
        assert_eq!(response.headers()[X_CACHE_STATUS], "HIT");
    }
}
