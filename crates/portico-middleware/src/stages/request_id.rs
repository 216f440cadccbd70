//! Request ID middleware.
//!
//! Tags every response with an `x-request-id` header. An inbound header is
//! propagated unchanged so upstream proxies can correlate; otherwise a
//! fresh UUIDv7 is generated.

use http::HeaderValue;
use portico_core::{BoxFuture, Request, Response};
use uuid::Uuid;

use crate::direct::{Middleware, Next};

/// Header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that stamps responses with a request ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestId;

impl RequestId {
    /// Creates the request ID middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestId {
    fn name(&self) -> &'static str {
        "request-id"
    }

    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map_or_else(|| Uuid::now_v7().to_string(), str::to_owned);

            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}
