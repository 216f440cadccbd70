//! Request logging middleware.
//!
//! Emits one `tracing` event per request with method, path, response status
//! and elapsed time. Provided for both calling conventions.

use std::time::Instant;

use portico_core::{BoxFuture, Exchange, Request, Response};

use crate::contextual::{ContextMiddleware, ContextNext};
use crate::direct::{Middleware, Next};

/// Logs each request in the direct convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl RequestLog {
    /// Creates the logging middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLog {
    fn name(&self) -> &'static str {
        "request-log"
    }

    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let started = Instant::now();

            let response = next.run(request).await;

            tracing::info!(
                %method,
                path,
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request served"
            );
            response
        })
    }
}

/// Logs each request in the contextual convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextRequestLog;

impl ContextRequestLog {
    /// Creates the logging middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ContextMiddleware for ContextRequestLog {
    fn name(&self) -> &'static str {
        "request-log"
    }

    fn handle<'a>(&'a self, exchange: Exchange, next: ContextNext<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = exchange.method().clone();
            let path = exchange.path().to_string();
            let started = Instant::now();

            let response = next.run(exchange).await;

            tracing::info!(
                %method,
                path,
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request served"
            );
            response
        })
    }
}
