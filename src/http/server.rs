//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the single catch-all handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Hand every request to the current Resolver
//! - Swap in a new Resolver when the configuration is reloaded
//! - Graceful shutdown, then drain deferred cache stores

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{EdgeCache, MemoryEdgeCache};
use crate::config::ProxyConfig;
use crate::http::request::{MakeRequestUuidV4, RequestIdExt};
use crate::lifecycle::{DeferredTasks, ShutdownSignal};
use crate::proxy::Resolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ArcSwap<Resolver>>,
}

/// HTTP server for the data proxy.
pub struct HttpServer {
    router: Router,
    resolver: Arc<ArcSwap<Resolver>>,
    cache: Arc<dyn EdgeCache>,
    tasks: DeferredTasks,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with an in-memory edge cache.
    pub fn new(config: ProxyConfig) -> Self {
        let cache: Arc<dyn EdgeCache> = Arc::new(MemoryEdgeCache::new(config.cache.max_entries));
        Self::with_cache(config, cache)
    }

    /// Create a server on top of an existing edge cache.
    pub fn with_cache(config: ProxyConfig, cache: Arc<dyn EdgeCache>) -> Self {
        let tasks = DeferredTasks::new();
        let resolver = Resolver::from_config(&config, cache.clone(), tasks.clone());
        Self::with_resolver(config, resolver)
    }

    /// Create a server around a fully assembled resolver.
    pub fn with_resolver(config: ProxyConfig, resolver: Resolver) -> Self {
        let cache = resolver.cache().clone();
        let tasks = resolver.tasks().clone();
        let resolver = Arc::new(ArcSwap::from_pointee(resolver));

        let state = AppState {
            resolver: resolver.clone(),
        };
        let router = Self::build_router(&config, state);

        Self {
            router,
            resolver,
            cache,
            tasks,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the resolver;
    /// the edge cache and pending stores carry over.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let resolver = self.resolver.clone();
        let cache = self.cache.clone();
        let tasks = self.tasks.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let next = Resolver::from_config(&config, cache.clone(), tasks.clone());
                resolver.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.recv())
            .await?;
        reloader.abort();

        tracing::info!("HTTP server stopped accepting, draining deferred tasks");
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        self.tasks.drain(grace).await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config the server was started with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn EdgeCache> {
        &self.cache
    }

    pub fn tasks(&self) -> &DeferredTasks {
        &self.tasks
    }
}

/// The URI is left out: a path the sanitizer rejects must never reach the logs.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        request_id = %request.request_id(),
    )
}

/// Catch-all handler: the resolver decides between pipeline and asset host.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let resolver = state.resolver.load_full();
    resolver.handle(request).await
}
