//! Middleware chain for the direct calling convention.
//!
//! Direct middleware wraps handlers that receive the raw request. Each unit
//! is handed a [`Next`] continuation and may run work before and after
//! delegating onward, or skip delegation entirely to short-circuit the
//! chain with its own response.

use std::sync::Arc;

use portico_core::{BoxFuture, Handler, Request, Response};

/// A middleware unit in the direct convention.
///
/// # Invariants
///
/// - `next` is consumed by value, so a unit can delegate at most once.
/// - A unit that never runs `next` short-circuits the chain; downstream
///   units and the terminal handler are not invoked.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this unit, used in logs.
    fn name(&self) -> &'static str;

    /// Processes one request, delegating onward through `next`.
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response>;
}

/// Continuation handed to a middleware unit.
///
/// Running it invokes the rest of the chain and finally the terminal
/// handler. Dropping it without running short-circuits the chain.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Invokes the next middleware, or the terminal handler at the end of
    /// the chain.
    pub fn run(self, request: Request) -> BoxFuture<'a, Response> {
        match self.remaining.split_first() {
            Some((unit, rest)) => unit.handle(
                request,
                Next {
                    remaining: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.call(request),
        }
    }
}

/// An ordered middleware list composed around a terminal handler.
///
/// Index 0 is outermost. Composition is a right-fold over the list; an
/// empty list yields the terminal handler's behavior unchanged.
pub struct Chain {
    units: Vec<Arc<dyn Middleware>>,
    terminal: Arc<dyn Handler>,
}

impl Chain {
    /// Composes `units` around `terminal`.
    #[must_use]
    pub fn new(units: Vec<Arc<dyn Middleware>>, terminal: Arc<dyn Handler>) -> Self {
        Self { units, terminal }
    }

    /// Runs one request through the chain.
    pub async fn run(&self, request: Request) -> Response {
        Next {
            remaining: &self.units,
            terminal: &*self.terminal,
        }
        .run(request)
        .await
    }

    /// Returns the unit names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.units.iter().map(|unit| unit.name()).collect()
    }

    /// Returns the number of units in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the chain has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// A middleware unit built from a plain function.
///
/// Useful for small units that do not warrant a named type:
///
/// ```rust,ignore
/// fn trace<'a>(request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
///     Box::pin(async move {
///         tracing::debug!(path = request.uri().path(), "dispatching");
///         next.run(request).await
///     })
/// }
///
/// let unit = FnMiddleware::new("trace", trace);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Wraps `func` as a named middleware unit.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        (self.func)(request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn terminal() -> Arc<dyn Handler> {
        Arc::new(|_request: Request| async move {
            http::Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from_static(b"terminal")))
                .unwrap()
        })
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    struct Tagger(&'static str);

    impl Middleware for Tagger {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut response = next.run(request).await;
                response
                    .headers_mut()
                    .append("x-tag", http::HeaderValue::from_static(self.0));
                response
            })
        }
    }

    #[tokio::test]
    async fn empty_chain_is_identity() {
        let chain = Chain::new(Vec::new(), terminal());
        assert!(chain.is_empty());

        let response = chain.run(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn units_unwind_inner_to_outer() {
        let chain = Chain::new(
            vec![Arc::new(Tagger("outer")), Arc::new(Tagger("inner"))],
            terminal(),
        );
        assert_eq!(chain.names(), vec!["outer", "inner"]);

        let response = chain.run(request()).await;
        let tags: Vec<_> = response.headers().get_all("x-tag").iter().collect();
        // Post-processing runs on the unwind, innermost first.
        assert_eq!(tags, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn fn_middleware_delegates() {
        fn passthrough<'a>(request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
            Box::pin(async move { next.run(request).await })
        }

        let chain = Chain::new(
            vec![Arc::new(FnMiddleware::new("passthrough", passthrough))],
            terminal(),
        );
        assert_eq!(chain.len(), 1);

        let response = chain.run(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
