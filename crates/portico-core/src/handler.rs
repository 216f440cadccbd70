//! Handler traits, one per calling convention.
//!
//! The two conventions are deliberately separate traits rather than a mode
//! flag checked at runtime. A server instance is parameterized by exactly
//! one of them, so registering a handler of the wrong shape is a compile
//! error instead of a startup failure.

use std::future::Future;

use crate::exchange::Exchange;
use crate::types::{BoxFuture, Request, Response};

/// A handler in the direct convention: receives the raw request.
///
/// Implemented for any `async fn(Request) -> Response` shaped closure.
pub trait Handler: Send + Sync + 'static {
    /// Invokes the handler for one request.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin((self)(request))
    }
}

/// A handler in the contextual convention: receives one [`Exchange`].
///
/// Implemented for any `async fn(Exchange) -> Response` shaped closure.
pub trait ContextHandler: Send + Sync + 'static {
    /// Invokes the handler for one exchange.
    fn call(&self, exchange: Exchange) -> BoxFuture<'static, Response>;
}

impl<F, Fut> ContextHandler for F
where
    F: Fn(Exchange) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, exchange: Exchange) -> BoxFuture<'static, Response> {
        Box::pin((self)(exchange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Arc;

    #[test]
    fn closure_implements_direct_handler() {
        let handler: Arc<dyn Handler> = Arc::new(|request: Request| async move {
            let mut response = http::Response::new(Full::new(Bytes::from_static(b"hi")));
            if request.method() == http::Method::DELETE {
                *response.status_mut() = StatusCode::NO_CONTENT;
            }
            response
        });

        let request = http::Request::builder()
            .method(http::Method::DELETE)
            .uri("/x")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = tokio_test::block_on(handler.call(request));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn closure_implements_context_handler() {
        let handler: Arc<dyn ContextHandler> =
            Arc::new(|cx: Exchange| async move { cx.json(&serde_json::json!({"ok": true})) });

        let (head, ()) = http::Request::builder()
            .uri("/x")
            .body(())
            .unwrap()
            .into_parts();
        let exchange = Exchange::new(head, Bytes::new(), None, Arc::from("test"));

        let response = tokio_test::block_on(handler.call(exchange));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
