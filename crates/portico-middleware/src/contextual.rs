//! Middleware chain for the contextual calling convention.
//!
//! The contextual variant mirrors [`direct`](crate::direct) but operates on
//! [`Exchange`] values instead of raw requests: the exchange is created once
//! at the edge of the chain and moved through every unit down to the
//! terminal handler.

use std::sync::Arc;

use portico_core::{BoxFuture, ContextHandler, Exchange, Response};

/// A middleware unit in the contextual convention.
///
/// Same contract as [`Middleware`](crate::direct::Middleware): delegate at
/// most once through `next`, or short-circuit by producing a response
/// without delegating.
pub trait ContextMiddleware: Send + Sync + 'static {
    /// Returns the name of this unit, used in logs.
    fn name(&self) -> &'static str;

    /// Processes one exchange, delegating onward through `next`.
    fn handle<'a>(&'a self, exchange: Exchange, next: ContextNext<'a>) -> BoxFuture<'a, Response>;
}

/// Continuation handed to a contextual middleware unit.
pub struct ContextNext<'a> {
    remaining: &'a [Arc<dyn ContextMiddleware>],
    terminal: &'a dyn ContextHandler,
}

impl<'a> ContextNext<'a> {
    /// Invokes the next middleware, or the terminal handler at the end of
    /// the chain.
    pub fn run(self, exchange: Exchange) -> BoxFuture<'a, Response> {
        match self.remaining.split_first() {
            Some((unit, rest)) => unit.handle(
                exchange,
                ContextNext {
                    remaining: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.call(exchange),
        }
    }
}

/// An ordered contextual middleware list composed around a terminal handler.
///
/// Index 0 is outermost; an empty list yields the terminal handler's
/// behavior unchanged.
pub struct ContextChain {
    units: Vec<Arc<dyn ContextMiddleware>>,
    terminal: Arc<dyn ContextHandler>,
}

impl ContextChain {
    /// Composes `units` around `terminal`.
    #[must_use]
    pub fn new(units: Vec<Arc<dyn ContextMiddleware>>, terminal: Arc<dyn ContextHandler>) -> Self {
        Self { units, terminal }
    }

    /// Runs one exchange through the chain.
    pub async fn run(&self, exchange: Exchange) -> Response {
        ContextNext {
            remaining: &self.units,
            terminal: &*self.terminal,
        }
        .run(exchange)
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

/// A contextual middleware unit built from a plain function.
pub struct FnContextMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnContextMiddleware<F> {
    /// Wraps `func` as a named middleware unit.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> ContextMiddleware for FnContextMiddleware<F>
where
    F: for<'a> Fn(Exchange, ContextNext<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, exchange: Exchange, next: ContextNext<'a>) -> BoxFuture<'a, Response> {
        (self.func)(exchange, next)
    }
}
