//! Server construction and lifecycle control.
//!
//! A [`Server`] is parameterized by its calling convention: the builder is
//! finished with [`ServerBuilder::build_direct`] or
//! [`ServerBuilder::build_contextual`], and from then on only handlers and
//! middleware of the matching shape can be registered. There is no mode
//! flag to check at runtime; mixing conventions does not compile.
//!
//! Running a server consumes it, which is what confines route and
//! middleware mutation to the setup phase: once the accept loop starts
//! there is no handle left to mutate through.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use portico_core::{response, BoxFuture, ContextHandler, Exchange, Handler, Request, Response};
use portico_middleware::{Chain, ContextChain, ContextMiddleware, Middleware};

use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::error::{ConfigError, ServerError};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::routes::RouteTable;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Direct {}
    impl Sealed for super::Contextual {}
}

/// Identity values the server shares with contextual handlers.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub(crate) host_name: Option<Arc<str>>,
    pub(crate) app_name: Arc<str>,
}

/// The composed, type-erased service the transport drives.
///
/// Produced once per run by [`Convention::compose`]; both conventions
/// reduce to the same shape here so the accept loop stays convention
/// agnostic.
pub struct RootService {
    inner: Arc<dyn Fn(Parts, Bytes) -> BoxFuture<'static, Response> + Send + Sync>,
}

impl RootService {
    fn new<F>(service: F) -> Self
    where
        F: Fn(Parts, Bytes) -> BoxFuture<'static, Response> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(service),
        }
    }

    pub(crate) fn call(&self, parts: Parts, body: Bytes) -> BoxFuture<'static, Response> {
        (self.inner)(parts, body)
    }
}

/// A calling convention: owns the routes and middleware registered under
/// it and knows how to compose them into a [`RootService`].
///
/// Implemented by [`Direct`] and [`Contextual`] only.
pub trait Convention: sealed::Sealed + Send + 'static {
    /// Returns the convention name, used in logs.
    fn kind(&self) -> &'static str;

    /// Wraps the route dispatcher in this convention's middleware chain.
    fn compose(self, identity: &ServerIdentity) -> RootService;
}

/// The direct convention: handlers and middleware receive raw requests.
pub struct Direct {
    routes: RouteTable<Arc<dyn Handler>>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Direct {
    fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            middleware: Vec::new(),
        }
    }
}

impl Convention for Direct {
    fn kind(&self) -> &'static str {
        "direct"
    }

    fn compose(self, _identity: &ServerIdentity) -> RootService {
        let routes = Arc::new(self.routes);
        let dispatch = move |request: Request| {
            let routes = Arc::clone(&routes);
            async move {
                let path = request.uri().path().to_string();
                let handler = routes
                    .find(request.method(), request.uri().path())
                    .map(Arc::clone);
                match handler {
                    Some(handler) => handler.call(request).await,
                    None => {
                        tracing::debug!(path, "no route matched");
                        response::not_found(&path)
                    }
                }
            }
        };
        let terminal: Arc<dyn Handler> = Arc::new(dispatch);

        let chain = Arc::new(Chain::new(self.middleware, terminal));
        tracing::debug!(stages = ?chain.names(), "composed middleware chain");

        RootService::new(move |parts, body| {
            let chain = Arc::clone(&chain);
            Box::pin(async move {
                chain
                    .run(http::Request::from_parts(parts, Full::new(body)))
                    .await
            })
        })
    }
}

/// The contextual convention: handlers and middleware receive [`Exchange`]
/// values carrying the request and the server identity.
pub struct Contextual {
    routes: RouteTable<Arc<dyn ContextHandler>>,
    middleware: Vec<Arc<dyn ContextMiddleware>>,
}

impl Contextual {
    fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            middleware: Vec::new(),
        }
    }
}

impl Convention for Contextual {
    fn kind(&self) -> &'static str {
        "contextual"
    }

    fn compose(self, identity: &ServerIdentity) -> RootService {
        let routes = Arc::new(self.routes);
        let dispatch = move |exchange: Exchange| {
            let routes = Arc::clone(&routes);
            async move {
                let handler = routes
                    .find(exchange.method(), exchange.path())
                    .map(Arc::clone);
                match handler {
                    Some(handler) => handler.call(exchange).await,
                    None => {
                        let path = exchange.path().to_string();
                        tracing::debug!(path, "no route matched");
                        response::not_found(&path)
                    }
                }
            }
        };
        let terminal: Arc<dyn ContextHandler> = Arc::new(dispatch);

        let chain = Arc::new(ContextChain::new(self.middleware, terminal));
        tracing::debug!(stages = ?chain.names(), "composed middleware chain");

        let host_name = identity.host_name.clone();
        let app_name = Arc::clone(&identity.app_name);
        RootService::new(move |parts, body| {
            let exchange = Exchange::new(parts, body, host_name.clone(), Arc::clone(&app_name));
            let chain = Arc::clone(&chain);
            Box::pin(async move { chain.run(exchange).await })
        })
    }
}

/// An HTTP server wired to one calling convention.
///
/// Routes and middleware are registered during setup; [`Server::run`]
/// consumes the server, composes the chain, starts the transport and
/// blocks until shutdown completes.
pub struct Server<C: Convention> {
    config: ServerConfig,
    lifecycle: Lifecycle,
    prefix: Option<String>,
    convention: C,
}

impl<C: Convention> Server<C> {
    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns an observer for lifecycle transitions.
    ///
    /// The receiver outlives the server, so the final `Stopped` or
    /// `Failed` state is observable after `run` returns.
    #[must_use]
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Mounts the whole route table under `prefix`.
    ///
    /// Dispatch strips the prefix before matching; requests outside it get
    /// a 404. A trailing `/` on the prefix is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrefix`] unless the prefix is a
    /// non-root path starting with `/`, and
    /// [`ConfigError::PrefixAlreadySet`] when called twice; overwriting a
    /// mounted prefix silently is never allowed.
    pub fn mount_prefix(&mut self, prefix: &str) -> Result<(), ConfigError> {
        if let Some(existing) = &self.prefix {
            return Err(ConfigError::PrefixAlreadySet {
                existing: existing.clone(),
            });
        }
        let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
        if trimmed.is_empty() || !trimmed.starts_with('/') {
            return Err(ConfigError::InvalidPrefix(prefix.to_string()));
        }
        self.prefix = Some(trimmed.to_string());
        Ok(())
    }

    /// Composes the root service and binds the listener.
    ///
    /// Split out from [`Server::run`] so callers can learn the bound
    /// address (port 0 resolves here) before serving.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Addr`] or [`ServerError::Bind`] when the
    /// configured address is unusable; the lifecycle ends in `Failed`.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        self.lifecycle.advance(LifecycleState::Composing);
        tracing::info!(convention = self.convention.kind(), "composing root service");

        let identity = ServerIdentity {
            host_name: self.config.host_name().map(Arc::from),
            app_name: Arc::from(self.config.app_name()),
        };
        let root = self.convention.compose(&identity);

        let addr = match self.config.socket_addr() {
            Ok(addr) => addr,
            Err(source) => {
                self.lifecycle.advance(LifecycleState::Failed);
                return Err(ServerError::Addr {
                    addr: self.config.addr().to_string(),
                    source,
                });
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.lifecycle.advance(LifecycleState::Failed);
                return Err(ServerError::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => {
                self.lifecycle.advance(LifecycleState::Failed);
                return Err(ServerError::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };

        tracing::info!(
            app = self.config.app_name(),
            version = self.config.app_version(),
            author = self.config.app_author(),
            "starting application"
        );
        if let Some(host) = self.config.host_name() {
            tracing::info!(host, "serving behind host name");
        }
        tracing::info!(addr = %local_addr, "listening");

        self.lifecycle.advance(LifecycleState::Running);
        Ok(BoundServer {
            listener,
            local_addr,
            inner: Arc::new(ServeInner {
                root,
                config: self.config,
                prefix: self.prefix,
            }),
            lifecycle: self.lifecycle,
        })
    }

    /// Runs the server until an OS interrupt (SIGTERM or SIGINT) arrives,
    /// then shuts down gracefully.
    ///
    /// Blocks the calling task until shutdown completes and returns the
    /// terminal result: `Ok(())` on a clean drain, or the shutdown error.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Addr`] or [`ServerError::Bind`] when startup
    /// fails, and [`ServerError::ShutdownTimeout`] when in-flight requests
    /// outlive the shutdown deadline.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::from_os_signals())
            .await
    }

    /// Runs the server with an injected shutdown notification.
    ///
    /// Same contract as [`Server::run`]; used by tests and by embeddings
    /// that manage their own interrupt source.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        self.bind().await?.serve(shutdown).await
    }
}

impl Server<Direct> {
    /// Registers a direct handler for `method` and `pattern`.
    ///
    /// Only handlers of the direct shape are accepted; a contextual
    /// handler is rejected at compile time:
    ///
    /// ```compile_fail
    /// use portico_core::Exchange;
    /// use portico_server::ServerBuilder;
    ///
    /// let mut server = ServerBuilder::new().build_direct();
    /// server
    ///     .get("/greet", |cx: Exchange| async move { cx.json(&"hi") })
    ///     .unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// See [`RouteTable::insert`].
    pub fn route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigError> {
        self.convention
            .routes
            .insert(method, pattern, Arc::new(handler))
    }

    /// Registers a GET handler.
    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a POST handler.
    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a PUT handler.
    pub fn put<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a DELETE handler.
    pub fn delete<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Appends a middleware unit; the first one added runs outermost.
    ///
    /// Middleware of the contextual shape is rejected at compile time:
    ///
    /// ```compile_fail
    /// use portico_middleware::stages::ContextRequestLog;
    /// use portico_server::ServerBuilder;
    ///
    /// let mut server = ServerBuilder::new().build_direct();
    /// server.add_middleware(ContextRequestLog::new());
    /// ```
    pub fn add_middleware<M: Middleware>(&mut self, middleware: M) {
        self.convention.middleware.push(Arc::new(middleware));
    }
}

impl Server<Contextual> {
    /// Registers a contextual handler for `method` and `pattern`.
    ///
    /// Only handlers of the contextual shape are accepted; a direct
    /// handler is rejected at compile time:
    ///
    /// ```compile_fail
    /// use portico_core::{response, Request};
    /// use portico_server::ServerBuilder;
    ///
    /// let mut server = ServerBuilder::new().build_contextual();
    /// server
    ///     .get("/greet", |request: Request| async move {
    ///         response::json(http::StatusCode::OK, &"hi")
    ///     })
    ///     .unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// See [`RouteTable::insert`].
    pub fn route<H: ContextHandler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigError> {
        self.convention
            .routes
            .insert(method, pattern, Arc::new(handler))
    }

    /// Registers a GET handler.
    pub fn get<H: ContextHandler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a POST handler.
    pub fn post<H: ContextHandler>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a PUT handler.
    pub fn put<H: ContextHandler>(&mut self, pattern: &str, handler: H) -> Result<(), ConfigError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a DELETE handler.
    pub fn delete<H: ContextHandler>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Appends a middleware unit; the first one added runs outermost.
    pub fn add_middleware<M: ContextMiddleware>(&mut self, middleware: M) {
        self.convention.middleware.push(Arc::new(middleware));
    }
}

/// Builder for [`Server`].
///
/// Every option has a documented default; the convention is chosen by the
/// finishing call.
#[derive(Debug, Clone, Default)]
pub struct ServerBuilder {
    config: ServerConfigBuilder,
}

impl ServerBuilder {
    /// Creates a builder preloaded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfigBuilder::new(),
        }
    }

    /// Sets the listen address (default `0.0.0.0:8080`).
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config = self.config.addr(addr);
        self
    }

    /// Sets the externally visible host name (default none).
    #[must_use]
    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.config = self.config.host_name(host_name);
        self
    }

    /// Sets the application name (default `MyAPIServer`).
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.app_name(name);
        self
    }

    /// Sets the application version (default `1.0.0`).
    #[must_use]
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config = self.config.app_version(version);
        self
    }

    /// Sets the application author (default `Ghost`).
    #[must_use]
    pub fn app_author(mut self, author: impl Into<String>) -> Self {
        self.config = self.config.app_author(author);
        self
    }

    /// Sets the read timeout (default 20s).
    #[must_use]
    pub fn read_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.read_timeout(timeout);
        self
    }

    /// Sets the write timeout (default 50s).
    #[must_use]
    pub fn write_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.write_timeout(timeout);
        self
    }

    /// Sets the idle timeout (default 50s).
    #[must_use]
    pub fn idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.idle_timeout(timeout);
        self
    }

    /// Sets the graceful shutdown deadline (default 30s).
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.shutdown_timeout(timeout);
        self
    }

    /// Finishes the builder with the direct calling convention.
    #[must_use]
    pub fn build_direct(self) -> Server<Direct> {
        Server {
            config: self.config.build(),
            lifecycle: Lifecycle::new(),
            prefix: None,
            convention: Direct::new(),
        }
    }

    /// Finishes the builder with the contextual calling convention.
    #[must_use]
    pub fn build_contextual(self) -> Server<Contextual> {
        Server {
            config: self.config.build(),
            lifecycle: Lifecycle::new(),
            prefix: None,
            convention: Contextual::new(),
        }
    }
}

/// A server whose listener is bound and whose chain is composed.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    inner: Arc<ServeInner>,
    lifecycle: Lifecycle,
}

/// State shared with every connection task.
struct ServeInner {
    root: RootService,
    config: ServerConfig,
    prefix: Option<String>,
}

impl BoundServer {
    /// Returns the bound address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `shutdown` fires, then drains in-flight
    /// requests bounded by the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ShutdownTimeout`] when the deadline elapses
    /// with connections still open. The lifecycle reaches `Stopped` either
    /// way; shutdown is attempted exactly once.
    pub async fn serve(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let inner = Arc::clone(&self.inner);
                        let guard = tracker.guard();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            handle_connection(inner, stream, remote_addr, shutdown).await;
                            drop(guard);
                        });
                    }
                    Err(err) => {
                        // Transient accept failures (EMFILE and friends) do
                        // not bring the server down.
                        tracing::error!(error = %err, "failed to accept connection");
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("interrupt received, stopping accept loop");
                    break;
                }
            }
        }

        self.lifecycle.advance(LifecycleState::ShuttingDown);
        // Close the listener first so new connections are rejected while
        // in-flight ones drain.
        drop(self.listener);

        let deadline = self.inner.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active(),
            deadline_secs = deadline.as_secs(),
            "draining in-flight connections"
        );

        let result = tokio::select! {
            _ = tracker.drained() => {
                tracing::info!("all connections drained");
                Ok(())
            }
            _ = tokio::time::sleep(deadline) => {
                let err = ServerError::ShutdownTimeout {
                    deadline,
                    active: tracker.active(),
                };
                tracing::error!(error = %err, "graceful shutdown incomplete");
                Err(err)
            }
        };

        self.lifecycle.advance(LifecycleState::Stopped);
        result
    }
}

/// Serves one connection, honoring graceful shutdown.
async fn handle_connection(
    inner: Arc<ServeInner>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) {
    let io = TokioIo::new(stream);
    let service_inner = Arc::clone(&inner);
    let service = service_fn(move |request: http::Request<Incoming>| {
        let inner = Arc::clone(&service_inner);
        async move { Ok::<_, Infallible>(handle_request(&inner, request).await) }
    });

    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new());
    builder.header_read_timeout(inner.config.read_timeout());

    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(err) = result {
                tracing::debug!(%remote_addr, error = %err, "connection ended with error");
            }
        }
        _ = shutdown.recv() => {
            // Disable keep-alive and let the in-flight request finish.
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.as_mut().await {
                tracing::debug!(%remote_addr, error = %err, "connection ended during shutdown");
            }
        }
    }
}

/// Handles one request: prefix stripping, bounded body collection, bounded
/// dispatch through the composed root service.
async fn handle_request(inner: &Arc<ServeInner>, request: http::Request<Incoming>) -> Response {
    let (mut parts, body) = request.into_parts();
    tracing::debug!(method = %parts.method, path = parts.uri.path(), "request received");

    if let Some(prefix) = inner.prefix.as_deref() {
        match strip_prefix(&parts.uri, prefix) {
            Some(uri) => parts.uri = uri,
            None => return response::not_found(parts.uri.path()),
        }
    }

    let collected = tokio::time::timeout(inner.config.read_timeout(), body.collect()).await;
    let body = match collected {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "failed to read request body");
            return response::json_error(StatusCode::BAD_REQUEST, "failed to read request body");
        }
        Err(_) => {
            tracing::warn!("timed out reading request body");
            return response::json_error(
                StatusCode::REQUEST_TIMEOUT,
                "timed out reading request body",
            );
        }
    };

    match tokio::time::timeout(inner.config.write_timeout(), inner.root.call(parts, body)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!("handler exceeded the write timeout");
            response::json_error(StatusCode::GATEWAY_TIMEOUT, "handler timed out")
        }
    }
}

/// Rewrites `uri` with `prefix` removed, or `None` if the path is outside
/// the prefix.
fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        // "/api/v1x" is outside the "/api/v1" prefix.
        return None;
    }
    let path = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
