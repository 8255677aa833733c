//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use aroi_proxy::cache::{CacheError, CacheKey, CachedResponse, EdgeCache, MemoryEdgeCache};
use aroi_proxy::lifecycle::{DeferredTasks, Shutdown};
use aroi_proxy::proxy::{AssetHost, Resolver, ResolverSettings};
use aroi_proxy::routing::RequestPath;
use aroi_proxy::storage::{BackendKind, BackendSet, ByteStream, FetchOutcome, FetchedObject, Fetcher, StorageOrder};
use aroi_proxy::{HttpServer, ProxyConfig};

/// What a [`ScriptedFetcher`] does on every call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Produce the object in the given chunks.
    Found(Vec<&'static str>),
    /// Nothing stored under any path.
    Absent,
    /// Never answer.
    Stall,
    /// Produce one chunk, then fail mid-body.
    Broken(&'static str),
    /// Produce one chunk, then go silent for good.
    StallAfter(&'static str),
}

/// A backend that follows a fixed script and counts its calls.
pub struct ScriptedFetcher {
    kind: BackendKind,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(kind: BackendKind, script: Script) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn fetch(&self, _path: &RequestPath) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body: ByteStream = match &self.script {
            Script::Found(chunks) => {
                let chunks: Vec<Result<Bytes, std::io::Error>> =
                    chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
                Box::pin(stream::iter(chunks))
            }
            Script::Absent => return FetchOutcome::Absent,
            Script::Stall => std::future::pending().await,
            Script::Broken(first) => Box::pin(stream::iter([
                Ok(Bytes::from_static(first.as_bytes())),
                Err(std::io::Error::other("connection reset")),
            ])),
            Script::StallAfter(first) => {
                Box::pin(stream::iter([Ok(Bytes::from_static(first.as_bytes()))]).chain(stream::pending()))
            }
        };
        FetchOutcome::Found(FetchedObject {
            source: self.kind,
            body,
        })
    }
}

/// An edge cache that never has anything and refuses every store.
#[derive(Default)]
pub struct FailingCache {
    stores: AtomicUsize,
}

impl FailingCache {
    pub fn store_attempts(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EdgeCache for FailingCache {
    async fn lookup(&self, _key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
        Err(CacheError::Unavailable("lookup refused".into()))
    }

    async fn store(&self, _key: CacheKey, _response: CachedResponse) -> Result<(), CacheError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("store refused".into()))
    }
}

/// An asset host that remembers which paths reached it.
#[derive(Default)]
pub struct RecordingAssetHost {
    seen: Mutex<Vec<String>>,
}

impl RecordingAssetHost {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetHost for RecordingAssetHost {
    async fn serve(&self, request: Request<Body>) -> Response {
        self.seen.lock().unwrap().push(request.uri().path().to_string());
        (StatusCode::OK, "asset").into_response()
    }
}

/// Settings with the given order and a short fetch deadline.
pub fn settings(order: &str) -> ResolverSettings {
    ResolverSettings {
        order: StorageOrder::parse(order),
        fetch_deadline: Duration::from_secs(1),
        ..ResolverSettings::default()
    }
}

pub fn resolver(
    settings: ResolverSettings,
    fetchers: Vec<Arc<ScriptedFetcher>>,
    cache: Arc<dyn EdgeCache>,
    assets: Arc<dyn AssetHost>,
) -> Resolver {
    let backends = fetchers
        .into_iter()
        .fold(BackendSet::new(), |set, fetcher| set.with(fetcher as Arc<dyn Fetcher>));
    Resolver::new(settings, backends, cache, assets, DeferredTasks::new())
}

pub fn memory_cache() -> Arc<dyn EdgeCache> {
    Arc::new(MemoryEdgeCache::new(64))
}

/// A GET for `uri` as the server would receive it.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", "data.example.org")
        .body(Body::empty())
        .unwrap()
}

/// Collect a response into status, headers and body.
pub async fn collect(response: Response) -> (StatusCode, HeaderMap, Bytes) {
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, parts.headers, body)
}

/// Start a programmable HTTP origin on an ephemeral port. `f` receives the
/// request path and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(path) = read_request_path(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.split_whitespace().nth(1).map(str::to_string)
}

/// A proxy running on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub tasks: DeferredTasks,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<ProxyConfig>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let tasks = server.tasks().clone();
    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();

    let signal = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, updates_rx, signal).await });

    RunningProxy {
        addr,
        tasks,
        shutdown,
        config_updates,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
