//! Resolution orchestrator.
//!
//! Owns one request from sanitized path to response: edge cache first, then
//! each configured backend in order, then a generic 404. Nothing below this
//! point can fail a request; every failure is a miss or an absence.

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::cache::{CacheKey, CachePolicy, CachedResponse, EdgeCache, TtlOverrides};
use crate::config::ProxyConfig;
use crate::http::response::{mark_cache_status, not_found, object_headers, with_headers, CacheStatus, HeaderPolicy};
use crate::lifecycle::DeferredTasks;
use crate::observability::metrics::{self, Outcome};
use crate::proxy::assets::{self, AssetHost};
use crate::resilience::timeouts::bounded;
use crate::routing::{sanitize, ProxyDecision, RequestPath};
use crate::storage::{BackendSet, ByteStream, FetchOutcome, FetchedObject, StorageOrder};

/// Chunks buffered between the body task and the client.
const CHUNK_BUFFER: usize = 16;

const FALLBACK_ORIGIN: &str = "http://localhost";

/// Everything the orchestrator derives from one configuration load.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub order: StorageOrder,
    pub ttls: TtlOverrides,
    pub header_policy: HeaderPolicy,
    pub fetch_deadline: Duration,
    pub max_entry_bytes: usize,
    pub public_origin: Option<String>,
}

impl ResolverSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let order = StorageOrder::parse(&config.storage.order);
        if order.is_empty() {
            tracing::warn!(order = %config.storage.order, "Storage order names no known backend; every proxied request will 404");
        }
        Self {
            order,
            ttls: TtlOverrides::from_config(&config.cache),
            header_policy: HeaderPolicy::from_config(&config.headers),
            fetch_deadline: Duration::from_secs(config.timeouts.backend_fetch_secs),
            max_entry_bytes: config.cache.max_entry_bytes,
            public_origin: config
                .cache
                .public_origin
                .as_deref()
                .map(|origin| origin.trim_end_matches('/').to_string()),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from_config(&ProxyConfig::default())
    }
}

pub struct Resolver {
    settings: ResolverSettings,
    backends: BackendSet,
    cache: Arc<dyn EdgeCache>,
    assets: Arc<dyn AssetHost>,
    tasks: DeferredTasks,
}

impl Resolver {
    pub fn new(
        settings: ResolverSettings,
        backends: BackendSet,
        cache: Arc<dyn EdgeCache>,
        assets: Arc<dyn AssetHost>,
        tasks: DeferredTasks,
    ) -> Self {
        Self {
            settings,
            backends,
            cache,
            assets,
            tasks,
        }
    }

    /// Build a resolver for `config`. The cache and task set are passed in
    /// so they can outlive a configuration reload.
    pub fn from_config(config: &ProxyConfig, cache: Arc<dyn EdgeCache>, tasks: DeferredTasks) -> Self {
        let settings = ResolverSettings::from_config(config);
        let backends = BackendSet::from_config(&config.storage, settings.fetch_deadline);
        let assets = assets::from_config(&config.assets);
        Self::new(settings, backends, cache, assets, tasks)
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<dyn EdgeCache> {
        &self.cache
    }

    pub fn tasks(&self) -> &DeferredTasks {
        &self.tasks
    }

    /// Entry point for every inbound request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let readable = matches!(*request.method(), Method::GET | Method::HEAD);
        // Raw path: percent-encoded traversal must still be visible here.
        let path = sanitize(request.uri().path());
        let decision = ProxyDecision::classify(&path);

        if !readable || !decision.eligible {
            let start = Instant::now();
            let response = self.assets.serve(request).await;
            metrics::record_request(Outcome::Passthrough, start);
            return response;
        }

        let key = CacheKey::new(&self.origin_for(&request), &path);
        self.resolve(&key, &path).await
    }

    /// Serve `path` from the edge cache or the first backend that has it.
    pub async fn resolve(&self, key: &CacheKey, path: &RequestPath) -> Response {
        let start = Instant::now();

        match self.cache.lookup(key).await {
            Ok(Some(cached)) => {
                tracing::debug!(cache_status = "HIT", path = %path, "Serving from edge cache");
                let mut response = cached.to_response();
                self.settings.header_policy.apply(response.headers_mut());
                mark_cache_status(&mut response, CacheStatus::Hit);
                metrics::record_request(Outcome::Hit, start);
                return response;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Edge cache lookup failed, treating as miss"),
        }

        let policy = CachePolicy::for_path(path, &self.settings.ttls);

        for kind in self.settings.order.kinds() {
            let Some(fetcher) = self.backends.get(*kind) else {
                continue;
            };
            let backend = kind.identifier();

            match bounded(self.settings.fetch_deadline, fetcher.fetch(path)).await {
                Ok(FetchOutcome::Found(object)) => {
                    metrics::record_backend_fetch(backend, "found");
                    tracing::debug!(
                        backend,
                        cache_status = "MISS",
                        ttl_secs = policy.ttl_secs,
                        path = %path,
                        "Serving from backend"
                    );
                    let response = self.respond_and_store(key.clone(), path, object, &policy);
                    metrics::record_request(Outcome::Miss, start);
                    return response;
                }
                Ok(FetchOutcome::Absent) => metrics::record_backend_fetch(backend, "absent"),
                Err(elapsed) => {
                    tracing::warn!(backend, error = %elapsed, "Backend fetch timed out");
                    metrics::record_backend_fetch(backend, "timeout");
                }
            }
        }

        metrics::record_request(Outcome::NotFound, start);
        not_found()
    }

    /// Stream `object` to the client while a detached task keeps a copy for
    /// the edge cache.
    fn respond_and_store(
        &self,
        key: CacheKey,
        path: &RequestPath,
        object: FetchedObject,
        policy: &CachePolicy,
    ) -> Response {
        let headers = object_headers(path, object.source, policy, &self.settings.header_policy);
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);

        let job = StoreJob {
            cache: self.cache.clone(),
            key,
            headers: headers.clone(),
            max_bytes: self.settings.max_entry_bytes,
            idle_timeout: self.settings.fetch_deadline,
        };
        self.tasks.spawn("cache_store", job.run(object.body, tx));

        let chunks = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        let mut response = with_headers(Body::from_stream(chunks), headers);
        mark_cache_status(&mut response, CacheStatus::Miss);
        response
    }

    fn origin_for<B>(&self, request: &Request<B>) -> String {
        if let Some(origin) = &self.settings.public_origin {
            return origin.clone();
        }
        let uri = request.uri();
        if let (Some(scheme), Some(authority)) = (uri.scheme(), uri.authority()) {
            return format!("{scheme}://{authority}");
        }
        match request.headers().get(HOST).and_then(|host| host.to_str().ok()) {
            Some(host) => format!("http://{host}"),
            None => FALLBACK_ORIGIN.to_string(),
        }
    }
}

/// Drives one backend body to its end, feeding the client and then the cache.
struct StoreJob {
    cache: Arc<dyn EdgeCache>,
    key: CacheKey,
    headers: HeaderMap,
    max_bytes: usize,
    /// Longest wait for the next chunk before the body counts as failed.
    idle_timeout: Duration,
}

impl StoreJob {
    async fn run(self, mut body: ByteStream, client: mpsc::Sender<Result<Bytes, std::io::Error>>) {
        let mut client = Some(client);
        // None once the body outgrows max_bytes.
        let mut copy = Some(BytesMut::new());

        loop {
            let next = match bounded(self.idle_timeout, body.next()).await {
                Ok(next) => next,
                Err(elapsed) => Some(Err(std::io::Error::new(std::io::ErrorKind::TimedOut, elapsed))),
            };
            let Some(chunk) = next else { break };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Object body failed mid-stream, not caching");
                    if let Some(tx) = &client {
                        let _ = tx.send(Err(e)).await;
                    }
                    metrics::record_cache_store("skipped");
                    return;
                }
            };

            if let Some(buf) = copy.as_mut() {
                if buf.len() + chunk.len() > self.max_bytes {
                    tracing::debug!(key = %self.key, max_bytes = self.max_bytes, "Object too large to cache");
                    copy = None;
                } else {
                    buf.extend_from_slice(&chunk);
                }
            }

            if let Some(tx) = &client {
                if tx.send(Ok(chunk)).await.is_err() {
                    tracing::debug!(key = %self.key, "Client went away, finishing body for the cache");
                    client = None;
                }
            }

            if client.is_none() && copy.is_none() {
                metrics::record_cache_store("skipped");
                return;
            }
        }

        // End the client body before waiting on the cache.
        drop(client);

        let Some(copy) = copy else {
            metrics::record_cache_store("skipped");
            return;
        };

        let cached = CachedResponse {
            status: StatusCode::OK,
            headers: self.headers,
            body: copy.freeze(),
        };
        match self.cache.store(self.key.clone(), cached).await {
            Ok(()) => {
                tracing::debug!(key = %self.key, "Stored in edge cache");
                metrics::record_cache_store("stored");
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Edge cache store failed");
                metrics::record_cache_store("failed");
            }
        }
    }
}
