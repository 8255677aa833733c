//! Static asset host: where every request the pipeline does not own goes.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::config::AssetConfig;
use crate::http::response::not_found;

#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Serve `request` untouched.
    async fn serve(&self, request: Request<Body>) -> Response;
}

/// Build the asset host described by `config`.
pub fn from_config(config: &AssetConfig) -> Arc<dyn AssetHost> {
    if let Some(upstream) = &config.upstream {
        match UpstreamAssetHost::new(upstream) {
            Some(host) => return Arc::new(host),
            None => tracing::error!(upstream = %upstream, "Invalid asset upstream, serving 404 instead"),
        }
    }
    if let Some(root) = &config.root {
        return Arc::new(StaticDirAssetHost::new(root));
    }
    Arc::new(NoAssetHost)
}

/// Forwards requests to another HTTP origin.
pub struct UpstreamAssetHost {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamAssetHost {
    /// `None` if `upstream` has no scheme or authority.
    pub fn new(upstream: &str) -> Option<Self> {
        let uri: Uri = upstream.parse().ok()?;
        let scheme = uri.scheme().cloned()?;
        let authority = uri.authority().cloned()?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Some(Self {
            client,
            scheme,
            authority,
        })
    }

    fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().ok()?);
        }
        Uri::from_parts(parts).ok()
    }
}

#[async_trait]
impl AssetHost for UpstreamAssetHost {
    async fn serve(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();
        let Some(uri) = self.rewrite(&parts.uri) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        parts.uri = uri;

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (parts, body): (_, hyper::body::Incoming) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(upstream = %self.authority, error = %e, "Asset upstream request failed");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Serves files from a local directory.
#[derive(Clone)]
pub struct StaticDirAssetHost {
    dir: ServeDir,
}

impl StaticDirAssetHost {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: ServeDir::new(root),
        }
    }
}

#[async_trait]
impl AssetHost for StaticDirAssetHost {
    async fn serve(&self, request: Request<Body>) -> Response {
        match self.dir.clone().oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}

/// No asset host configured: everything outside the pipeline is a 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssetHost;

#[async_trait]
impl AssetHost for NoAssetHost {
    async fn serve(&self, _request: Request<Body>) -> Response {
        not_found()
    }
}
